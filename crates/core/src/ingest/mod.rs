pub mod extractor;
pub mod matching;
pub mod normalize;
pub mod screener;
pub mod sections;
pub mod source;
pub mod throttle;

pub use extractor::{CompanyExtractor, DataExtractor};
pub use screener::ScreenerClient;
