use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single scraped numeric field after normalization.
///
/// Serialized as a plain number, or `null` when the upstream value was missing or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Metric {
    Value(f64),
    #[default]
    Unavailable,
}

impl Metric {
    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Unavailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Metric::Value(_))
    }

    pub fn or(self, other: Metric) -> Metric {
        if self.is_available() {
            self
        } else {
            other
        }
    }
}

impl From<Option<f64>> for Metric {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) if v.is_finite() => Metric::Value(v),
            _ => Metric::Unavailable,
        }
    }
}

impl From<Metric> for Option<f64> {
    fn from(m: Metric) -> Self {
        m.value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Overview,
    Ratios,
    QuarterlyResults,
    Shareholding,
    Announcements,
    CreditRatings,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Overview,
        Section::Ratios,
        Section::QuarterlyResults,
        Section::Shareholding,
        Section::Announcements,
        Section::CreditRatings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::Ratios => "ratios",
            Section::QuarterlyResults => "quarterly_results",
            Section::Shareholding => "shareholding",
            Section::Announcements => "announcements",
            Section::CreditRatings => "credit_ratings",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::Ratios => "financial ratios",
            Section::QuarterlyResults => "quarterly results",
            Section::Shareholding => "shareholding pattern",
            Section::Announcements => "announcements",
            Section::CreditRatings => "credit ratings",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicData {
    pub current_price: Metric,
    pub market_cap: Metric,
    pub pe_ratio: Metric,
    pub pb_ratio: Metric,
    pub dividend_yield: Metric,
    pub book_value: Metric,
}

/// Percentage fields are percentage points; the rest are plain ratios.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialRatios {
    pub roe: Metric,
    pub roce: Metric,
    pub debt_to_equity: Metric,
    pub current_ratio: Metric,
    pub interest_coverage: Metric,
    pub asset_turnover: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyResult {
    pub period: String,
    pub revenue: Metric,
    pub net_profit: Metric,
    pub eps: Metric,
    pub revenue_growth: Metric,
    pub profit_growth: Metric,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareholdingPattern {
    pub promoter: Metric,
    pub public: Metric,
    pub institutional: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub date: Option<NaiveDate>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCompanyData {
    pub company_name: String,
    pub listing_id: String,
    pub basic: BasicData,
    pub ratios: FinancialRatios,
    pub quarterly_results: Vec<QuarterlyResult>,
    pub shareholding: ShareholdingPattern,
    pub announcements: Vec<Announcement>,
    pub credit_ratings: Vec<String>,
    /// Sections whose fetch failed after retries; their fields are unavailable.
    pub unavailable_sections: Vec<Section>,
    pub fetched_at: DateTime<Utc>,
}

impl RawCompanyData {
    pub fn empty(
        company_name: impl Into<String>,
        listing_id: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            listing_id: listing_id.into(),
            basic: BasicData::default(),
            ratios: FinancialRatios::default(),
            quarterly_results: Vec::new(),
            shareholding: ShareholdingPattern::default(),
            announcements: Vec::new(),
            credit_ratings: Vec::new(),
            unavailable_sections: Vec::new(),
            fetched_at,
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.unavailable_sections.is_empty()
    }

    pub fn latest_quarter(&self) -> Option<&QuarterlyResult> {
        self.quarterly_results.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metric_serializes_as_number_or_null() {
        let ratios = FinancialRatios {
            roe: Metric::Value(24.5),
            ..Default::default()
        };
        let v = serde_json::to_value(&ratios).unwrap();
        assert_eq!(v["roe"], json!(24.5));
        assert_eq!(v["roce"], json!(null));

        let back: FinancialRatios = serde_json::from_value(v).unwrap();
        assert_eq!(back, ratios);
    }

    #[test]
    fn non_finite_values_become_unavailable() {
        assert_eq!(Metric::from(Some(f64::NAN)), Metric::Unavailable);
        assert_eq!(Metric::from(Some(f64::INFINITY)), Metric::Unavailable);
        assert_eq!(Metric::from(Some(1.5)), Metric::Value(1.5));
    }

    #[test]
    fn or_prefers_available_value() {
        assert_eq!(
            Metric::Unavailable.or(Metric::Value(3.0)),
            Metric::Value(3.0)
        );
        assert_eq!(Metric::Value(1.0).or(Metric::Value(3.0)), Metric::Value(1.0));
    }
}
