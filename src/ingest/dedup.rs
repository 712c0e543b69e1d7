//! Streaming keep-first de-duplication by GeoNames id.

use hashbrown::HashSet;

use toponym::GeoRecord;

/// Passes the first record seen for each id and drops later ones.
///
/// Shared across every dump of a batch run so that the whole corpus keeps
/// unique identifiers.
#[derive(Debug, Default)]
pub struct KeepFirst {
    seen: HashSet<u64>,
    duplicates: usize,
}

impl KeepFirst {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record if its id has not been seen before
    pub fn admit(&mut self, record: GeoRecord) -> Option<GeoRecord> {
        if self.seen.insert(record.geonameid) {
            Some(record)
        } else {
            self.duplicates += 1;
            None
        }
    }

    /// Unique ids admitted so far
    pub fn unique(&self) -> usize {
        self.seen.len()
    }

    /// Records dropped as duplicates so far
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(geonameid: u64, name: &str) -> GeoRecord {
        GeoRecord {
            geonameid,
            name: name.to_string(),
            asciiname: name.to_string(),
            alternatenames: Vec::new(),
            latitude: 0.0,
            longitude: 0.0,
            feature_class: "P".to_string(),
            feature_code: "PPL".to_string(),
            country_code: "XX".to_string(),
            cc2: Vec::new(),
            admin1_code: String::new(),
            admin2_code: String::new(),
            admin3_code: String::new(),
            admin4_code: String::new(),
            population: None,
            elevation: None,
            dem: None,
            timezone: String::new(),
            modification_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_keeps_first_occurrence() {
        let mut dedup = KeepFirst::new();
        let stream = vec![
            record(1, "first"),
            record(2, "other"),
            record(1, "second"),
            record(1, "third"),
        ];

        let kept: Vec<GeoRecord> = stream.into_iter().filter_map(|r| dedup.admit(r)).collect();

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].name, "first");
        assert_eq!(kept[1].geonameid, 2);
        assert_eq!(dedup.unique(), 2);
        assert_eq!(dedup.duplicates(), 2);
    }

    #[test]
    fn test_empty_stream() {
        let dedup = KeepFirst::new();
        assert_eq!(dedup.unique(), 0);
        assert_eq!(dedup.duplicates(), 0);
    }
}
