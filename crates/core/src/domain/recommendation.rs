use crate::domain::company::Section;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Label::Buy => "Buy",
            Label::Sell => "Sell",
            Label::Hold => "Hold",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    FinancialHealth,
    Growth,
    Valuation,
    Profitability,
    Governance,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::FinancialHealth,
        Factor::Growth,
        Factor::Valuation,
        Factor::Profitability,
        Factor::Governance,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Factor::FinancialHealth => 0.30,
            Factor::Growth => 0.25,
            Factor::Valuation => 0.20,
            Factor::Profitability => 0.15,
            Factor::Governance => 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: Factor,
    pub score: f64,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub overall_score: f64,
    pub financial_health: FactorScore,
    pub growth: FactorScore,
    pub valuation: FactorScore,
    pub profitability: FactorScore,
    pub governance: FactorScore,
}

impl KeyMetrics {
    pub fn factors(&self) -> [&FactorScore; 5] {
        [
            &self.financial_health,
            &self.growth,
            &self.valuation,
            &self.profitability,
            &self.governance,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub company_name: String,
    pub label: Label,
    pub confidence_score: f64,
    pub reasoning: Vec<String>,
    pub key_metrics: KeyMetrics,
    pub unavailable_sections: Vec<Section>,
    pub timestamp: DateTime<Utc>,
}
