use crate::config::Settings;
use crate::domain::company::{RawCompanyData, Section};
use crate::domain::recommendation::{FactorScore, KeyMetrics, Label, Recommendation};
use crate::scoring::factors::{self, round4};
use chrono::{DateTime, Utc};

pub const BUY_THRESHOLD: f64 = 0.75;
pub const SELL_THRESHOLD: f64 = 0.35;

#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine {
    max_reasons: usize,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(15)
    }
}

impl ScoringEngine {
    pub fn new(max_reasons: usize) -> Self {
        Self { max_reasons }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.max_reasons)
    }

    pub fn score(&self, data: &RawCompanyData) -> KeyMetrics {
        let financial_health = factors::financial_health(data);
        let growth = factors::growth(data);
        let valuation = factors::valuation(data);
        let profitability = factors::profitability(data);
        let governance = factors::governance(data);
        let overall_score = aggregate([
            &financial_health,
            &growth,
            &valuation,
            &profitability,
            &governance,
        ]);
        KeyMetrics {
            overall_score,
            financial_health,
            growth,
            valuation,
            profitability,
            governance,
        }
    }

    pub fn recommend(&self, data: &RawCompanyData, timestamp: DateTime<Utc>) -> Recommendation {
        let key_metrics = self.score(data);
        let label = label_for(key_metrics.overall_score);
        let reasoning = merge_reasoning(
            &key_metrics.factors(),
            self.max_reasons,
            &data.unavailable_sections,
        );
        tracing::debug!(
            company = %data.company_name,
            score = key_metrics.overall_score,
            %label,
            "scored company"
        );
        Recommendation {
            company_name: data.company_name.clone(),
            label,
            confidence_score: key_metrics.overall_score,
            reasoning,
            key_metrics,
            unavailable_sections: data.unavailable_sections.clone(),
            timestamp,
        }
    }
}

pub fn aggregate(scores: [&FactorScore; 5]) -> f64 {
    let total: f64 = scores.iter().map(|s| s.factor.weight() * s.score).sum();
    round4(total.clamp(0.0, 1.0))
}

pub fn label_for(score: f64) -> Label {
    if score >= BUY_THRESHOLD {
        Label::Buy
    } else if score <= SELL_THRESHOLD {
        Label::Sell
    } else {
        Label::Hold
    }
}

/// Factor reasons in factor order, then a note naming any sections that could not be fetched.
/// The note takes the last of the `max_reasons` slots.
pub fn merge_reasoning(
    factors: &[&FactorScore],
    max_reasons: usize,
    unavailable: &[Section],
) -> Vec<String> {
    let note = (!unavailable.is_empty() && max_reasons > 0).then(|| {
        let names: Vec<&str> = unavailable.iter().map(|s| s.label()).collect();
        format!(
            "Analysis based on partial data: {} unavailable",
            names.join(", ")
        )
    });
    let budget = max_reasons - usize::from(note.is_some());

    let mut out: Vec<String> = factors
        .iter()
        .flat_map(|f| f.reasoning.iter().cloned())
        .take(budget)
        .collect();
    out.extend(note);
    out
}
