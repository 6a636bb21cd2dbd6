use crate::domain::company::Section;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingCandidate {
    pub display_name: String,
    pub listing_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SectionTable {
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(|c| c.trim().is_empty()))
    }
}

/// Page-fetch collaborator for the upstream financial data site.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn search(&self, name: &str) -> Result<Vec<ListingCandidate>>;

    async fn fetch_section(&self, listing_id: &str, section: Section) -> Result<SectionTable>;
}
