use crate::config::Settings;
use crate::domain::company::RawCompanyData;
use crate::domain::query::CompanyQuery;
use crate::domain::recommendation::Recommendation;
use crate::error::PipelineError;
use crate::ingest::extractor::{CompanyExtractor, DataExtractor};
use crate::ingest::screener::ScreenerClient;
use crate::ingest::source::ListingSource;
use crate::scoring::ScoringEngine;
use crate::storage::{CacheStats, CompanyCache};
use crate::time::clock::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Entry point of the pipeline: cache lookup, extraction on miss, then scoring.
pub struct RecommendationService {
    extractor: Arc<dyn CompanyExtractor>,
    cache: CompanyCache,
    engine: ScoringEngine,
    clock: Arc<dyn Clock>,
    recommend_timeout: Duration,
}

impl RecommendationService {
    pub fn new(
        extractor: Arc<dyn CompanyExtractor>,
        cache: CompanyCache,
        engine: ScoringEngine,
        clock: Arc<dyn Clock>,
        recommend_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            cache,
            engine,
            clock,
            recommend_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let source = Arc::new(ScreenerClient::from_settings(settings)?);
        Ok(Self::with_source(source, settings, Arc::new(SystemClock)))
    }

    pub fn with_source(
        source: Arc<dyn ListingSource>,
        settings: &Settings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let extractor = DataExtractor::from_settings(source, settings, clock.clone());
        Self::new(
            Arc::new(extractor),
            CompanyCache::from_settings(settings, clock.clone()),
            ScoringEngine::from_settings(settings),
            clock,
            settings.recommend_timeout,
        )
    }

    pub async fn recommend(&self, company_name: &str) -> Result<Recommendation, PipelineError> {
        let data = self.raw_data(company_name).await?;
        let rec = self.engine.recommend(&data, self.clock.now());
        tracing::info!(
            company = %rec.company_name,
            label = %rec.label,
            score = rec.confidence_score,
            partial = data.is_partial(),
            "recommendation ready"
        );
        Ok(rec)
    }

    pub async fn raw_data(&self, company_name: &str) -> Result<Arc<RawCompanyData>, PipelineError> {
        let query = CompanyQuery::parse(company_name)?;
        let extractor = self.extractor.clone();
        let name = query.display().to_string();

        let lookup = self.cache.get_or_fetch(query.key(), move || async move {
            extractor.extract(&name).await
        });
        match tokio::time::timeout(self.recommend_timeout, lookup).await {
            Ok(res) => res,
            Err(_) => {
                tracing::warn!(
                    company = %query.display(),
                    waited = ?self.recommend_timeout,
                    "gave up waiting; extraction continues in the background"
                );
                Err(PipelineError::Timeout {
                    company: query.display().to_string(),
                    waited: self.recommend_timeout,
                })
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::Label;
    use crate::ingest::throttle::{Backoff, RequestThrottle, RetryPolicy};
    use crate::testing::{
        fixed_time, headline_company, healthy_company, healthy_tables, CountingExtractor, StubSource,
    };
    use crate::time::clock::ManualClock;

    fn service_with(
        extractor: Arc<dyn CompanyExtractor>,
        clock: Arc<ManualClock>,
        timeout: Duration,
    ) -> RecommendationService {
        RecommendationService::new(
            extractor,
            CompanyCache::new(Duration::from_secs(3600), 100, clock.clone()),
            ScoringEngine::default(),
            clock,
            timeout,
        )
    }

    fn stub_service(source: StubSource) -> RecommendationService {
        let clock = Arc::new(ManualClock::new(fixed_time()));
        let extractor = DataExtractor::new(
            Arc::new(source),
            RequestThrottle::new(Duration::from_millis(10)),
            RetryPolicy {
                max_attempts: 2,
                backoff: Backoff::Fixed(Duration::from_millis(5)),
                attempt_timeout: Duration::from_secs(1),
            },
            0.8,
            clock.clone(),
        );
        service_with(Arc::new(extractor), clock, Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_company_end_to_end_is_buy() {
        let service = stub_service(StubSource::new(
            &["Acme Industries Ltd", "Acme Chemicals Ltd"],
            healthy_tables(),
        ));
        let rec = service.recommend("  acme   industries ").await.unwrap();

        assert_eq!(rec.company_name, "Acme Industries Ltd");
        assert_eq!(rec.label, Label::Buy);
        assert!(rec.confidence_score >= 0.75);
        let text = rec.reasoning.join("\n");
        assert!(text.contains("ROE"), "{text}");
        assert!(text.contains("revenue growth"), "{text}");
        assert!(text.contains("promoter holding"), "{text}");
        assert!(rec.unavailable_sections.is_empty());
    }

    #[tokio::test]
    async fn strong_roe_growth_and_promoter_alone_are_a_buy() {
        for in_band_others in [true, false] {
            let extractor = Arc::new(CountingExtractor::new(
                Some(headline_company(in_band_others)),
                Duration::ZERO,
            ));
            let clock = Arc::new(ManualClock::new(fixed_time()));
            let service = service_with(extractor, clock, Duration::from_secs(5));
            let rec = service.recommend("Acme Industries").await.unwrap();

            assert_eq!(rec.label, Label::Buy);
            assert!(rec.confidence_score >= 0.75);
            let text = rec.reasoning.join("\n");
            assert!(text.contains("ROE"), "{text}");
            assert!(text.contains("revenue growth"), "{text}");
            assert!(text.contains("promoter holding"), "{text}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_company_is_not_found_and_not_cached() {
        let service = stub_service(StubSource::new(&[], healthy_tables()));
        let err = service.recommend("Nonexistent Widgets").await.unwrap_err();

        assert_eq!(
            err,
            PipelineError::CompanyNotFound {
                company: "Nonexistent Widgets".to_string()
            }
        );
        assert_eq!(service.cache_stats().size, 0);
    }

    #[tokio::test]
    async fn invalid_names_never_reach_the_extractor() {
        let extractor = Arc::new(CountingExtractor::new(Some(healthy_company()), Duration::ZERO));
        let clock = Arc::new(ManualClock::new(fixed_time()));
        let service = service_with(extractor.clone(), clock, Duration::from_secs(5));

        for bad in ["", "  ", "A", "123456"] {
            assert!(matches!(
                service.recommend(bad).await,
                Err(PipelineError::InvalidCompanyName { .. })
            ));
        }
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_one_extraction() {
        let extractor = Arc::new(CountingExtractor::new(
            Some(healthy_company()),
            Duration::from_millis(100),
        ));
        let clock = Arc::new(ManualClock::new(fixed_time()));
        let service = Arc::new(service_with(
            extractor.clone(),
            clock,
            Duration::from_secs(5),
        ));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..12 {
            let service = service.clone();
            let name = if i % 2 == 0 { "Acme Industries" } else { "ACME  industries" };
            tasks.spawn(async move { service.recommend(name).await });
        }
        while let Some(res) = tasks.join_next().await {
            assert_eq!(res.unwrap().unwrap().label, Label::Buy);
        }

        assert_eq!(extractor.calls(), 1);
        assert_eq!(service.cache_stats().size, 1);
    }

    #[tokio::test]
    async fn repeat_requests_differ_only_in_timestamp() {
        let extractor = Arc::new(CountingExtractor::new(Some(healthy_company()), Duration::ZERO));
        let clock = Arc::new(ManualClock::new(fixed_time()));
        let service = service_with(extractor.clone(), clock.clone(), Duration::from_secs(5));

        let first = service.recommend("Acme Industries").await.unwrap();
        clock.advance(chrono::Duration::seconds(30));
        let mut second = service.recommend("acme industries").await.unwrap();

        assert_ne!(first.timestamp, second.timestamp);
        second.timestamp = first.timestamp;
        assert_eq!(first, second);
        assert_eq!(extractor.calls(), 1);
        assert_eq!(service.cache_stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_extraction_times_out_but_still_fills_cache() {
        let extractor = Arc::new(CountingExtractor::new(
            Some(healthy_company()),
            Duration::from_secs(10),
        ));
        let clock = Arc::new(ManualClock::new(fixed_time()));
        let service = service_with(extractor.clone(), clock, Duration::from_secs(1));

        let err = service.recommend("Acme Industries").await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { .. }));
        assert!(err.is_retryable());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(service.cache_stats().size, 1);
        assert!(service.recommend("Acme Industries").await.is_ok());
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test]
    async fn clear_cache_forces_a_new_extraction() {
        let extractor = Arc::new(CountingExtractor::new(Some(healthy_company()), Duration::ZERO));
        let clock = Arc::new(ManualClock::new(fixed_time()));
        let service = service_with(extractor.clone(), clock, Duration::from_secs(5));

        service.recommend("Acme Industries").await.unwrap();
        service.clear_cache();
        service.recommend("Acme Industries").await.unwrap();
        assert_eq!(extractor.calls(), 2);
    }
}
