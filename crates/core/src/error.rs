use crate::domain::company::Section;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid company name {input:?}: {reason}")]
    InvalidCompanyName { input: String, reason: &'static str },

    #[error("company {company:?} not found on the upstream source")]
    CompanyNotFound { company: String },

    #[error("upstream unavailable for {company:?} (failed sections: {}): {detail}", format_sections(.failed_sections))]
    UpstreamUnavailable {
        company: String,
        failed_sections: Vec<Section>,
        detail: String,
    },

    #[error("timed out after {waited:?} waiting for data on {company:?}")]
    Timeout { company: String, waited: Duration },
}

impl PipelineError {
    pub fn company(&self) -> &str {
        match self {
            Self::InvalidCompanyName { input, .. } => input,
            Self::CompanyNotFound { company }
            | Self::UpstreamUnavailable { company, .. }
            | Self::Timeout { company, .. } => company,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. } | Self::Timeout { .. })
    }
}

fn format_sections(sections: &[Section]) -> String {
    if sections.is_empty() {
        return "none".to_string();
    }
    sections
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
