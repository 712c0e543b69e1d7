//! Candidate retrieval, scoring and ranking.

use std::path::Path;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::DisambiguationError;
use super::query::DisambiguationQuery;
use super::source::CandidateSource;
use crate::models::{Coordinates, GeoRecord};
use crate::scoring::{score_attributes, score_name, score_proximity};

/// Ranking limits, loadable from the `[engine]` table of a TOML file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Candidates requested from the source regardless of K
    pub over_fetch: usize,
    /// K when the query does not specify one
    pub default_limit: usize,
    /// Upper bound on K
    pub max_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            over_fetch: 50,
            default_limit: 10,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EngineConfigFile {
    #[serde(default)]
    engine: EngineConfig,
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read engine config")?;
        let file: EngineConfigFile =
            toml::from_str(&content).context("Failed to parse engine config")?;
        file.engine.validate()?;
        Ok(file.engine)
    }

    /// Reject limits that would make every request empty
    pub fn validate(&self) -> Result<()> {
        if self.over_fetch == 0 {
            bail!("engine.over_fetch must be at least 1");
        }
        if self.default_limit == 0 || self.max_limit == 0 {
            bail!("engine.default_limit and engine.max_limit must be at least 1");
        }
        if self.default_limit > self.max_limit {
            bail!(
                "engine.default_limit ({}) exceeds engine.max_limit ({})",
                self.default_limit,
                self.max_limit
            );
        }
        Ok(())
    }
}

/// Individual terms behind a confidence score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Name similarity, 0 to 100
    pub name: f64,
    /// Population and feature class, 0 to 80
    pub attributes: f64,
    /// Proximity to the reference point, 0 to 20
    pub proximity: f64,
}

impl ScoreBreakdown {
    pub fn compute(query_name: &str, reference: Option<Coordinates>, record: &GeoRecord) -> Self {
        Self {
            name: score_name(query_name, &record.name),
            attributes: score_attributes(
                record.population,
                &record.feature_class,
                &record.feature_code,
            ),
            proximity: score_proximity(reference, record.coordinates()),
        }
    }

    /// Sum of the terms halved onto a nominal 0 to 100 scale.
    ///
    /// This orders candidates; it is not a probability.
    pub fn confidence(&self) -> f64 {
        (self.name + self.attributes + self.proximity) / 2.0
    }
}

/// A candidate with its per-request ranking score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub record: GeoRecord,
    pub confidence_score: f64,
    pub scores: ScoreBreakdown,
}

/// Outcome of a well-formed disambiguation request
#[derive(Debug, Clone)]
pub enum Disambiguation {
    /// At least one candidate, best first, at most K long
    Ranked(Vec<ScoredCandidate>),
    /// The source returned no candidates
    NotFound,
}

impl Disambiguation {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Disambiguation::NotFound)
    }

    pub fn candidates(&self) -> &[ScoredCandidate] {
        match self {
            Disambiguation::Ranked(candidates) => candidates,
            Disambiguation::NotFound => &[],
        }
    }

    pub fn into_candidates(self) -> Vec<ScoredCandidate> {
        match self {
            Disambiguation::Ranked(candidates) => candidates,
            Disambiguation::NotFound => Vec::new(),
        }
    }
}

/// Stateless ranking engine over an injected candidate source
pub struct DisambiguationEngine<S> {
    source: S,
    config: EngineConfig,
}

impl<S: CandidateSource> DisambiguationEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(source: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the underlying candidate source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Rank candidates for a place name and return the best K
    pub async fn disambiguate(
        &self,
        query: &DisambiguationQuery,
    ) -> Result<Disambiguation, DisambiguationError> {
        let validated = query.validate(self.config.default_limit, self.config.max_limit)?;
        let window = self.config.over_fetch;

        let mut pool = self
            .source
            .find_candidates(validated.name, &validated.filters, window)
            .await
            .map_err(DisambiguationError::CandidateSourceUnavailable)?;

        if pool.len() > window {
            debug!(
                "Candidate source returned {} records for a window of {}, truncating",
                pool.len(),
                window
            );
            pool.truncate(window);
        }

        if pool.is_empty() {
            debug!("No candidates for '{}'", validated.name);
            return Ok(Disambiguation::NotFound);
        }

        let ranked = rank(pool, validated.name, validated.reference, validated.limit);

        let Some(top) = ranked.first().map(|c| c.confidence_score) else {
            return Ok(Disambiguation::NotFound);
        };
        debug!(
            "Ranked candidates for '{}', returning {} (top score {:.2})",
            validated.name,
            ranked.len(),
            top
        );

        Ok(Disambiguation::Ranked(ranked))
    }
}

/// Score every candidate, sort best first keeping pool order on ties, keep `limit`.
pub fn rank(
    pool: Vec<GeoRecord>,
    query_name: &str,
    reference: Option<Coordinates>,
    limit: usize,
) -> Vec<ScoredCandidate> {
    // Indexed parallel collect preserves pool order ahead of the stable sort
    let mut scored: Vec<ScoredCandidate> = pool
        .into_par_iter()
        .map(|record| {
            let scores = ScoreBreakdown::compute(query_name, reference, &record);
            ScoredCandidate {
                confidence_score: scores.confidence(),
                scores,
                record,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::disambiguation::source::{CandidateFilters, InMemoryCandidateSource};
    use crate::models::record::fixtures::record;

    /// Returns a fixed pool regardless of the request, recording what was asked
    struct FixedSource {
        pool: Vec<GeoRecord>,
        requested: AtomicUsize,
        filters: Mutex<Option<CandidateFilters>>,
    }

    impl FixedSource {
        fn new(pool: Vec<GeoRecord>) -> Self {
            Self {
                pool,
                requested: AtomicUsize::new(0),
                filters: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl CandidateSource for FixedSource {
        async fn find_candidates(
            &self,
            _text: &str,
            filters: &CandidateFilters,
            max_results: usize,
        ) -> anyhow::Result<Vec<GeoRecord>> {
            self.requested.store(max_results, Ordering::SeqCst);
            *self.filters.lock().unwrap() = Some(filters.clone());
            Ok(self.pool.clone())
        }
    }

    struct FailingSource;

    #[async_trait::async_trait]
    impl CandidateSource for FailingSource {
        async fn find_candidates(
            &self,
            _text: &str,
            _filters: &CandidateFilters,
            _max_results: usize,
        ) -> anyhow::Result<Vec<GeoRecord>> {
            anyhow::bail!("connection refused")
        }
    }

    fn identical_pool(n: u64) -> Vec<GeoRecord> {
        (1..=n).map(|id| record(id, "Springfield")).collect()
    }

    fn ids(result: &Disambiguation) -> Vec<u64> {
        result.candidates().iter().map(|c| c.record.geonameid).collect()
    }

    #[tokio::test]
    async fn test_ties_keep_source_order() {
        let engine = DisambiguationEngine::new(FixedSource::new(identical_pool(10)));
        let query = DisambiguationQuery::new("Springfield").with_limit(3);

        let result = engine.disambiguate(&query).await.unwrap();
        assert_eq!(ids(&result), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_over_fetch_window_is_fixed() {
        let source = FixedSource::new(identical_pool(80));
        let engine = DisambiguationEngine::new(source);

        let query = DisambiguationQuery::new("Springfield").with_limit(100);
        let result = engine.disambiguate(&query).await.unwrap();

        assert_eq!(engine.source().requested.load(Ordering::SeqCst), 50);
        assert_eq!(result.candidates().len(), 50);
        assert_eq!(ids(&result), (1..=50).collect::<Vec<_>>());

        let query = DisambiguationQuery::new("Springfield").with_limit(1);
        engine.disambiguate(&query).await.unwrap();
        assert_eq!(engine.source().requested.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn test_filters_forwarded() {
        let engine = DisambiguationEngine::new(FixedSource::new(identical_pool(1)));
        let query = DisambiguationQuery::new("Springfield")
            .with_country("US")
            .with_admin1("IL");
        engine.disambiguate(&query).await.unwrap();

        let filters = engine.source().filters.lock().unwrap().clone().unwrap();
        assert_eq!(filters.country_code.as_deref(), Some("US"));
        assert_eq!(filters.admin1_code.as_deref(), Some("IL"));
    }

    #[tokio::test]
    async fn test_san_francisco_scenario() {
        let mut far = record(3837675, "San Francisco");
        far.latitude = -31.42797;
        far.longitude = -62.08266;
        far.feature_class = "S".into();
        far.feature_code = "FRM".into();
        far.country_code = "US".into();
        far.population = Some(120);

        let mut city = record(5391959, "San Francisco");
        city.latitude = 37.77493;
        city.longitude = -122.41942;
        city.feature_class = "P".into();
        city.feature_code = "PPLA2".into();
        city.country_code = "US".into();
        city.admin1_code = "CA".into();
        city.population = Some(864_816);

        // Weaker candidate first so the ranking has to reorder
        let source = InMemoryCandidateSource::new(vec![far, city]);
        let engine = DisambiguationEngine::new(source);

        let query = DisambiguationQuery::new("San Francisco")
            .with_country("US")
            .near(37.7, -122.4)
            .with_limit(1);

        let result = engine.disambiguate(&query).await.unwrap();
        let candidates = result.into_candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].record.geonameid, 5391959);

        // 100 name + (8.64816 + 30) attributes + ~19.1 proximity, halved
        let top = &candidates[0];
        assert_eq!(top.scores.name, 100.0);
        assert!(top.scores.proximity > 19.0);
        assert!((top.confidence_score - 78.9).abs() < 0.5, "{}", top.confidence_score);
    }

    #[tokio::test]
    async fn test_non_textual_signals_reorder() {
        let mut village = record(1, "Paris");
        village.feature_class = "P".into();
        village.population = Some(900);

        let mut capital = record(2, "Paris");
        capital.feature_class = "P".into();
        capital.population = Some(2_138_551);

        let engine = DisambiguationEngine::new(FixedSource::new(vec![village, capital]));
        let result = engine
            .disambiguate(&DisambiguationQuery::new("Paris"))
            .await
            .unwrap();
        assert_eq!(ids(&result), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_empty_pool_is_not_found() {
        let engine = DisambiguationEngine::new(FixedSource::new(Vec::new()));
        let result = engine
            .disambiguate(&DisambiguationQuery::new("Atlantis"))
            .await
            .unwrap();
        assert!(result.is_not_found());
        assert!(result.into_candidates().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_queries() {
        let engine = DisambiguationEngine::new(FixedSource::new(identical_pool(1)));

        let mut partial = DisambiguationQuery::new("Springfield");
        partial.latitude = Some(39.8);
        assert!(matches!(
            engine.disambiguate(&partial).await,
            Err(DisambiguationError::InvalidQuery(_))
        ));

        assert!(matches!(
            engine.disambiguate(&DisambiguationQuery::new("   ")).await,
            Err(DisambiguationError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let engine = DisambiguationEngine::new(FailingSource);
        let err = engine
            .disambiguate(&DisambiguationQuery::new("Springfield"))
            .await
            .unwrap_err();
        assert!(matches!(err, DisambiguationError::CandidateSourceUnavailable(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_engine_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[engine]\nover_fetch = 80\n").unwrap();

        let config = EngineConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.over_fetch, 80);
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.max_limit, 100);
    }

    #[test]
    fn test_engine_config_rejects_zero_limits() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[engine]\ndefault_limit = 0\n").unwrap();
        assert!(EngineConfig::load_from_file(file.path()).is_err());

        let defaults = EngineConfig::default();
        for config in [
            EngineConfig {
                over_fetch: 0,
                ..defaults.clone()
            },
            EngineConfig {
                max_limit: 0,
                ..defaults.clone()
            },
            EngineConfig {
                default_limit: 20,
                max_limit: 5,
                ..defaults.clone()
            },
        ] {
            assert!(config.validate().is_err(), "{:?}", config);
        }
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_with_config_rejects_zero_default_limit() {
        let config = EngineConfig {
            default_limit: 0,
            ..EngineConfig::default()
        };
        let engine = DisambiguationEngine::with_config(FixedSource::new(identical_pool(1)), config);
        assert!(engine.is_err());
    }

    #[tokio::test]
    async fn test_debug_logging_with_ranked_results() {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let engine = DisambiguationEngine::new(InMemoryCandidateSource::new(vec![record(
            2988507, "Paris",
        )]));
        let result = engine
            .disambiguate(&DisambiguationQuery::new("Paris"))
            .await
            .unwrap();
        assert_eq!(ids(&result), vec![2988507]);
    }

    #[test]
    fn test_confidence_is_halved_sum() {
        let scores = ScoreBreakdown {
            name: 100.0,
            attributes: 80.0,
            proximity: 20.0,
        };
        assert_eq!(scores.confidence(), 100.0);
    }
}
