use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyQuery {
    display: String,
    key: String,
}

impl CompanyQuery {
    pub fn parse(input: &str) -> Result<Self, PipelineError> {
        let display = collapse_whitespace(input);
        let invalid = |reason| PipelineError::InvalidCompanyName {
            input: input.to_string(),
            reason,
        };

        if display.chars().count() < 2 {
            return Err(invalid("must be at least 2 characters"));
        }
        if display.chars().all(|c| c.is_ascii_digit() || c == ' ') {
            return Err(invalid("must not be only digits"));
        }

        let key = cache_key(&display);
        Ok(Self { display, key })
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Case-folds and collapses whitespace so that equivalent spellings share one cache entry.
pub fn cache_key(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
