//! Disambiguation request and its validation.

use serde::Deserialize;

use super::error::DisambiguationError;
use super::source::CandidateFilters;
use crate::models::Coordinates;

/// A free-text place name plus optional contextual hints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisambiguationQuery {
    pub name: String,
    pub country_code: Option<String>,
    pub admin1_code: Option<String>,
    /// Reference latitude; must come with `longitude`
    pub latitude: Option<f64>,
    /// Reference longitude; must come with `latitude`
    pub longitude: Option<f64>,
    /// Number of results wanted (K); engine default when absent
    pub limit: Option<usize>,
}

impl DisambiguationQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }

    pub fn with_admin1(mut self, admin1_code: impl Into<String>) -> Self {
        self.admin1_code = Some(admin1_code.into());
        self
    }

    pub fn near(mut self, lat: f64, lon: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lon);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check the query and resolve defaults against the engine limits.
    pub(crate) fn validate(
        &self,
        default_limit: usize,
        max_limit: usize,
    ) -> Result<ValidatedQuery<'_>, DisambiguationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DisambiguationError::invalid("name must not be empty"));
        }

        let reference = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                let point = Coordinates::new(lat, lon);
                if !point.is_valid() {
                    return Err(DisambiguationError::invalid(format!(
                        "reference coordinates out of range: ({}, {})",
                        lat, lon
                    )));
                }
                Some(point)
            }
            (None, None) => None,
            _ => {
                return Err(DisambiguationError::invalid(
                    "latitude and longitude must be given together",
                ))
            }
        };

        let limit = match self.limit {
            Some(0) => return Err(DisambiguationError::invalid("limit must be positive")),
            Some(k) => k.min(max_limit),
            None => default_limit.min(max_limit),
        };

        Ok(ValidatedQuery {
            name,
            filters: CandidateFilters {
                country_code: non_blank(&self.country_code),
                admin1_code: non_blank(&self.admin1_code),
            },
            reference,
            limit,
        })
    }
}

/// Blank filter values from query strings count as absent
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[derive(Debug)]
pub(crate) struct ValidatedQuery<'a> {
    pub name: &'a str,
    pub filters: CandidateFilters,
    pub reference: Option<Coordinates>,
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        for name in ["", "   ", "\t\n"] {
            let err = DisambiguationQuery::new(name).validate(10, 100).unwrap_err();
            assert!(matches!(err, DisambiguationError::InvalidQuery(_)));
        }
    }

    #[test]
    fn test_partial_coordinates_rejected() {
        let mut query = DisambiguationQuery::new("Paris");
        query.latitude = Some(48.85);
        assert!(matches!(
            query.validate(10, 100),
            Err(DisambiguationError::InvalidQuery(_))
        ));

        let mut query = DisambiguationQuery::new("Paris");
        query.longitude = Some(2.35);
        assert!(matches!(
            query.validate(10, 100),
            Err(DisambiguationError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let query = DisambiguationQuery::new("Paris").near(91.0, 2.35);
        assert!(query.validate(10, 100).is_err());
    }

    #[test]
    fn test_limits() {
        let query = DisambiguationQuery::new("Paris");
        assert_eq!(query.validate(10, 100).unwrap().limit, 10);

        let query = DisambiguationQuery::new("Paris").with_limit(500);
        assert_eq!(query.validate(10, 100).unwrap().limit, 100);

        let query = DisambiguationQuery::new("Paris").with_limit(0);
        assert!(query.validate(10, 100).is_err());
    }

    #[test]
    fn test_name_trimmed_and_filters_normalized() {
        let query = DisambiguationQuery::new("  Paris ")
            .with_country("FR")
            .with_admin1(" ")
            .near(48.85, 2.35);
        let validated = query.validate(10, 100).unwrap();

        assert_eq!(validated.name, "Paris");
        assert_eq!(validated.filters.country_code.as_deref(), Some("FR"));
        assert_eq!(validated.filters.admin1_code, None);
        assert_eq!(validated.reference, Some(Coordinates::new(48.85, 2.35)));
    }
}
