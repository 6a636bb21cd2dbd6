pub mod domain;
pub mod error;
pub mod ingest;
pub mod scoring;
pub mod service;
pub mod storage;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use error::PipelineError;
pub use service::RecommendationService;

pub mod config {
    use crate::ingest::throttle::Backoff;
    use std::time::Duration;

    const DEFAULT_BASE_URL: &str = "https://www.screener.in";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_MAX_RETRIES: u32 = 3;
    const DEFAULT_RATE_LIMIT_DELAY_SECS: f64 = 1.0;
    const DEFAULT_RETRY_BASE_DELAY_SECS: f64 = 1.0;
    const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
    const DEFAULT_MAX_CACHE_SIZE: usize = 1000;
    const DEFAULT_RECOMMEND_TIMEOUT_SECS: u64 = 120;
    const DEFAULT_MAX_REASONS: usize = 15;
    const DEFAULT_MATCH_THRESHOLD: f64 = 0.80;
    const MAX_DELAY_SECS: f64 = 3600.0;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub base_url: String,
        pub request_timeout: Duration,
        pub max_retries: u32,
        pub rate_limit_delay: Duration,
        pub backoff: Backoff,
        pub cache_ttl: Duration,
        pub max_cache_size: usize,
        pub recommend_timeout: Duration,
        pub max_reasons: usize,
        pub match_threshold: f64,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self::from_lookup(|_| None)
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self::from_lookup(|key| std::env::var(key).ok()))
        }

        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
            let parse_u64 = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
            // Fractional seconds in [0, MAX_DELAY_SECS]; anything else falls back.
            let parse_delay = |key: &str, default_secs: f64| {
                lookup(key)
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|v| (0.0..=MAX_DELAY_SECS).contains(v))
                    .and_then(|v| Duration::try_from_secs_f64(v).ok())
                    .unwrap_or_else(|| Duration::from_secs_f64(default_secs))
            };

            let base_delay = parse_delay("RETRY_BASE_DELAY", DEFAULT_RETRY_BASE_DELAY_SECS);
            let backoff = match lookup("RETRY_BACKOFF")
                .map(|s| s.trim().to_ascii_lowercase())
                .as_deref()
            {
                Some("fixed") => Backoff::Fixed(base_delay),
                _ => Backoff::Exponential { base: base_delay },
            };

            Self {
                base_url: lookup("SCREENER_BASE_URL")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                request_timeout: Duration::from_secs(
                    parse_u64("REQUEST_TIMEOUT").unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
                ),
                max_retries: lookup("MAX_RETRIES")
                    .and_then(|s| s.trim().parse::<u32>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_MAX_RETRIES),
                rate_limit_delay: parse_delay("RATE_LIMIT_DELAY", DEFAULT_RATE_LIMIT_DELAY_SECS),
                backoff,
                cache_ttl: Duration::from_secs(
                    parse_u64("CACHE_TTL").unwrap_or(DEFAULT_CACHE_TTL_SECS),
                ),
                max_cache_size: lookup("MAX_CACHE_SIZE")
                    .and_then(|s| s.trim().parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_MAX_CACHE_SIZE),
                recommend_timeout: Duration::from_secs(
                    parse_u64("RECOMMEND_TIMEOUT").unwrap_or(DEFAULT_RECOMMEND_TIMEOUT_SECS),
                ),
                max_reasons: lookup("MAX_REASONS")
                    .and_then(|s| s.trim().parse::<usize>().ok())
                    .unwrap_or(DEFAULT_MAX_REASONS),
                match_threshold: lookup("MATCH_THRESHOLD")
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .filter(|v| (0.0..=1.0).contains(v))
                    .unwrap_or(DEFAULT_MATCH_THRESHOLD),
                sentry_dsn: lookup("SENTRY_DSN").filter(|s| !s.trim().is_empty()),
            }
        }
    }

}
