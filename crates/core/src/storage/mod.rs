pub mod cache;

pub use cache::{CacheStats, CompanyCache};
