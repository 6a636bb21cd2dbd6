use crate::config::Settings;
use crate::domain::company::{RawCompanyData, Section};
use crate::error::PipelineError;
use crate::ingest::matching;
use crate::ingest::sections::{self, Overview};
use crate::ingest::source::{ListingSource, SectionTable};
use crate::ingest::throttle::{RequestThrottle, RetryPolicy};
use crate::time::clock::Clock;
use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait CompanyExtractor: Send + Sync {
    async fn extract(&self, company_name: &str) -> Result<RawCompanyData, PipelineError>;
}

/// Drives a [`ListingSource`]: resolves the listing, then fetches every section independently
/// through the shared throttle, retrying each with backoff. Sections that stay unavailable are
/// recorded on the record instead of failing the extraction.
pub struct DataExtractor {
    source: Arc<dyn ListingSource>,
    throttle: RequestThrottle,
    retry: RetryPolicy,
    match_threshold: f64,
    clock: Arc<dyn Clock>,
}

impl DataExtractor {
    pub fn new(
        source: Arc<dyn ListingSource>,
        throttle: RequestThrottle,
        retry: RetryPolicy,
        match_threshold: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            throttle,
            retry,
            match_threshold,
            clock,
        }
    }

    pub fn from_settings(
        source: Arc<dyn ListingSource>,
        settings: &Settings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            source,
            RequestThrottle::new(settings.rate_limit_delay),
            RetryPolicy {
                max_attempts: settings.max_retries,
                backoff: settings.backoff,
                attempt_timeout: settings.request_timeout,
            },
            settings.match_threshold,
            clock,
        )
    }

    async fn with_retries<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.throttle.acquire().await;

            let res = match tokio::time::timeout(self.retry.attempt_timeout, op()).await {
                Ok(res) => res,
                Err(_) => Err(anyhow!(
                    "{what} timed out after {:?}",
                    self.retry.attempt_timeout
                )),
            };

            match res {
                Ok(v) => return Ok(v),
                Err(err) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(err.context(format!("{what} failed after {attempt} attempts")));
                    }
                    let backoff = self.retry.backoff.delay(attempt);
                    tracing::warn!(
                        attempt,
                        ?backoff,
                        source = self.source.source_name(),
                        error = %err,
                        "{what} failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn fetch_section(&self, listing_id: &str, section: Section) -> Result<SectionTable> {
        let what = format!("fetch {section}");
        self.with_retries(&what, || self.source.fetch_section(listing_id, section))
            .await
            .with_context(|| format!("section {section} unavailable for {listing_id}"))
    }
}

#[async_trait::async_trait]
impl CompanyExtractor for DataExtractor {
    async fn extract(&self, company_name: &str) -> Result<RawCompanyData, PipelineError> {
        let candidates = self
            .with_retries("search", || self.source.search(company_name))
            .await
            .map_err(|err| PipelineError::UpstreamUnavailable {
                company: company_name.to_string(),
                failed_sections: Vec::new(),
                detail: format!("{err:#}"),
            })?;

        let resolved = matching::resolve(company_name, &candidates, self.match_threshold)
            .ok_or_else(|| {
                tracing::info!(
                    company = %company_name,
                    candidates = candidates.len(),
                    "no listing matched"
                );
                PipelineError::CompanyNotFound {
                    company: company_name.to_string(),
                }
            })?;
        let listing = resolved.candidate.clone();
        tracing::info!(
            company = %company_name,
            listing = %listing.listing_id,
            matched = %listing.display_name,
            similarity = resolved.similarity,
            exact = resolved.exact,
            "resolved listing"
        );

        let mut data = RawCompanyData::empty(
            listing.display_name.clone(),
            listing.listing_id.clone(),
            self.clock.now(),
        );
        let mut overview = Overview::default();
        let mut last_error = None;

        for section in Section::ALL {
            let table = match self.fetch_section(&listing.listing_id, section).await {
                Ok(table) => table,
                Err(err) => {
                    tracing::warn!(
                        company = %company_name,
                        %section,
                        error = %format!("{err:#}"),
                        "section degraded to unavailable"
                    );
                    data.unavailable_sections.push(section);
                    last_error = Some(err);
                    continue;
                }
            };

            match section {
                Section::Overview => overview = sections::parse_overview(&table),
                Section::Ratios => data.ratios = sections::parse_ratios(&table),
                Section::QuarterlyResults => {
                    data.quarterly_results = sections::parse_quarterly_results(&table)
                }
                Section::Shareholding => data.shareholding = sections::parse_shareholding(&table),
                Section::Announcements => {
                    data.announcements = sections::parse_announcements(&table)
                }
                Section::CreditRatings => {
                    data.credit_ratings = sections::parse_credit_ratings(&table)
                }
            }
        }

        if data.unavailable_sections.len() == Section::ALL.len() {
            return Err(PipelineError::UpstreamUnavailable {
                company: company_name.to_string(),
                failed_sections: data.unavailable_sections,
                detail: last_error
                    .map(|e| format!("{e:#}"))
                    .unwrap_or_else(|| "all section fetches failed".to_string()),
            });
        }

        sections::merge_overview(&mut data, overview);
        tracing::info!(
            company = %company_name,
            listing = %data.listing_id,
            quarters = data.quarterly_results.len(),
            unavailable = data.unavailable_sections.len(),
            "extraction complete"
        );
        Ok(data)
    }
}
