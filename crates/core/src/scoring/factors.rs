//! Each factor starts at 0.5 and moves by per-metric threshold steps, clamped to [0, 1].
//! A strong headline metric (ROE, revenue growth, promoter holding) alone saturates its factor.

use crate::domain::company::{Metric, QuarterlyResult, RawCompanyData};
use crate::domain::recommendation::{Factor, FactorScore};

const NEUTRAL: f64 = 0.5;
const TREND_QUARTERS: usize = 4;

pub fn financial_health(data: &RawCompanyData) -> FactorScore {
    let mut t = Tally::new(Factor::FinancialHealth);
    let r = &data.ratios;

    match r.debt_to_equity.value() {
        None => t.unavailable("Debt-to-equity"),
        Some(de) if de < 0.5 => t.adjust(
            0.20,
            format!("Low debt-to-equity ratio of {de:.2} indicates a strong balance sheet"),
        ),
        Some(de) if de > 2.0 => t.adjust(
            -0.30,
            format!("Very high debt-to-equity ratio of {de:.2} signals heavy leverage"),
        ),
        Some(de) if de > 1.0 => t.adjust(
            -0.20,
            format!("High debt-to-equity ratio of {de:.2} raises concerns about financial stability"),
        ),
        Some(_) => {}
    }

    match r.current_ratio.value() {
        None => t.unavailable("Current ratio"),
        Some(cr) if cr > 1.5 => t.adjust(
            0.15,
            format!("Current ratio of {cr:.2} indicates healthy liquidity"),
        ),
        Some(cr) if cr < 1.0 => t.adjust(
            -0.15,
            format!("Current ratio of {cr:.2} may indicate liquidity concerns"),
        ),
        Some(_) => {}
    }

    match r.interest_coverage.value() {
        None => t.unavailable("Interest coverage"),
        Some(ic) if ic > 5.0 => t.adjust(
            0.15,
            format!("Interest coverage of {ic:.1}x shows ample capacity to service debt"),
        ),
        Some(ic) if ic < 2.0 => t.adjust(
            -0.20,
            format!("Weak interest coverage of {ic:.1}x raises debt servicing concerns"),
        ),
        Some(_) => {}
    }

    t.finish()
}

pub fn growth(data: &RawCompanyData) -> FactorScore {
    let mut t = Tally::new(Factor::Growth);
    let quarters = &data.quarterly_results;

    let revenue_growth = latest_or_trend(quarters, |q| q.revenue_growth, |q| q.revenue);
    match revenue_growth {
        None => t.unavailable("Revenue growth"),
        Some(g) if g > 15.0 => t.adjust(0.50, format!("Strong revenue growth of {g:.1}%")),
        Some(g) if g > 5.0 => t.adjust(0.20, format!("Moderate revenue growth of {g:.1}%")),
        Some(g) if g < -5.0 => t.adjust(-0.25, format!("Declining revenue growth of {g:.1}%")),
        Some(_) => {}
    }

    let profit_growth = latest_or_trend(quarters, |q| q.profit_growth, |q| q.net_profit);
    match profit_growth {
        None => t.unavailable("Profit growth"),
        Some(g) if g > 20.0 => t.adjust(0.25, format!("Excellent net profit growth of {g:.1}%")),
        Some(g) if g > 10.0 => t.adjust(0.10, format!("Good net profit growth of {g:.1}%")),
        Some(g) if g < -10.0 => {
            t.adjust(-0.25, format!("Concerning net profit growth of {g:.1}%"))
        }
        Some(_) => {}
    }

    t.finish()
}

pub fn valuation(data: &RawCompanyData) -> FactorScore {
    let mut t = Tally::new(Factor::Valuation);
    let b = &data.basic;

    match b.pe_ratio.value() {
        None => t.unavailable("P/E ratio"),
        Some(pe) if pe <= 0.0 => t.adjust(
            -0.10,
            "Negative earnings make the P/E ratio meaningless".to_string(),
        ),
        Some(pe) if pe < 15.0 => t.adjust(0.20, format!("Attractive P/E ratio of {pe:.1}")),
        Some(pe) if pe < 25.0 => t.adjust(0.05, format!("Reasonable P/E ratio of {pe:.1}")),
        Some(pe) if pe > 40.0 => t.adjust(
            -0.15,
            format!("High P/E ratio of {pe:.1} may indicate overvaluation"),
        ),
        Some(_) => {}
    }

    match b.pb_ratio.value() {
        None => t.unavailable("P/B ratio"),
        Some(pb) if pb <= 0.0 => t.adjust(-0.05, "Negative book value per share".to_string()),
        Some(pb) if pb < 1.5 => t.adjust(0.15, format!("Attractive P/B ratio of {pb:.1}")),
        Some(pb) if pb > 3.0 => t.adjust(-0.10, format!("High P/B ratio of {pb:.1}")),
        Some(_) => {}
    }

    match b.dividend_yield.value() {
        None => t.unavailable("Dividend yield"),
        Some(dy) if dy > 2.0 => t.adjust(0.10, format!("Good dividend yield of {dy:.1}%")),
        Some(_) => {}
    }

    t.finish()
}

pub fn profitability(data: &RawCompanyData) -> FactorScore {
    let mut t = Tally::new(Factor::Profitability);
    let r = &data.ratios;

    match r.roe.value() {
        None => t.unavailable("ROE"),
        Some(roe) if roe >= 20.0 => t.adjust(0.50, format!("Excellent ROE of {roe:.1}%")),
        Some(roe) if roe >= 15.0 => t.adjust(0.25, format!("Good ROE of {roe:.1}%")),
        Some(roe) if roe < 5.0 => t.adjust(-0.25, format!("Weak ROE of {roe:.1}%")),
        Some(roe) if roe < 10.0 => t.adjust(-0.10, format!("Below average ROE of {roe:.1}%")),
        Some(_) => {}
    }

    match r.roce.value() {
        None => t.unavailable("ROCE"),
        Some(roce) if roce >= 20.0 => t.adjust(0.15, format!("Strong ROCE of {roce:.1}%")),
        Some(roce) if roce >= 15.0 => t.adjust(0.10, format!("Good ROCE of {roce:.1}%")),
        Some(roce) if roce < 10.0 => t.adjust(-0.10, format!("Low ROCE of {roce:.1}%")),
        Some(_) => {}
    }

    match net_margin(data.latest_quarter()) {
        None => t.unavailable("Net profit margin"),
        Some(m) if m > 15.0 => t.adjust(0.10, format!("High net profit margin of {m:.1}%")),
        Some(m) if m < 5.0 => t.adjust(-0.10, format!("Thin net profit margin of {m:.1}%")),
        Some(_) => {}
    }

    match r.asset_turnover.value() {
        None => t.unavailable("Asset turnover"),
        Some(at) if at > 1.5 => t.adjust(0.05, format!("Efficient asset turnover of {at:.2}")),
        Some(at) if at < 0.5 => t.adjust(-0.05, format!("Low asset turnover of {at:.2}")),
        Some(_) => {}
    }

    t.finish()
}

pub fn governance(data: &RawCompanyData) -> FactorScore {
    let mut t = Tally::new(Factor::Governance);
    let s = &data.shareholding;

    match s.promoter.value() {
        None => t.unavailable("Promoter holding"),
        Some(p) if (40.0..=75.0).contains(&p) => {
            t.adjust(0.50, format!("Healthy promoter holding of {p:.1}%"))
        }
        Some(p) if p > 80.0 => t.adjust(
            -0.10,
            format!("Very high promoter holding of {p:.1}% may limit free float"),
        ),
        Some(p) if p < 25.0 => t.adjust(
            -0.20,
            format!("Low promoter holding of {p:.1}% may signal weak promoter commitment"),
        ),
        Some(_) => {}
    }

    match s.institutional.value() {
        None => t.unavailable("Institutional holding"),
        Some(i) if i > 20.0 => t.adjust(0.10, format!("Good institutional holding of {i:.1}%")),
        Some(_) => {}
    }

    t.finish()
}

/// Latest published growth figure, else the trend over the last four quarters.
fn latest_or_trend(
    quarters: &[QuarterlyResult],
    growth: impl Fn(&QuarterlyResult) -> Metric,
    level: impl Fn(&QuarterlyResult) -> Metric,
) -> Option<f64> {
    if let Some(g) = quarters.first().and_then(|q| growth(q).value()) {
        return Some(g);
    }
    trend(quarters, level)
}

/// Mean of the latest two quarters against the mean of the two before them, in percent.
fn trend(quarters: &[QuarterlyResult], level: impl Fn(&QuarterlyResult) -> Metric) -> Option<f64> {
    let values: Vec<f64> = quarters
        .iter()
        .take(TREND_QUARTERS)
        .map(|q| level(q).value())
        .collect::<Option<_>>()?;
    if values.len() < TREND_QUARTERS {
        return None;
    }
    let recent = (values[0] + values[1]) / 2.0;
    let older = (values[2] + values[3]) / 2.0;
    if older == 0.0 {
        return None;
    }
    Some((recent - older) / older.abs() * 100.0)
}

fn net_margin(q: Option<&QuarterlyResult>) -> Option<f64> {
    let q = q?;
    match (q.net_profit.value(), q.revenue.value()) {
        (Some(p), Some(r)) if r > 0.0 => Some(p / r * 100.0),
        _ => None,
    }
}

struct Tally {
    factor: Factor,
    score: f64,
    findings: Vec<(f64, String)>,
}

impl Tally {
    fn new(factor: Factor) -> Self {
        Self {
            factor,
            score: NEUTRAL,
            findings: Vec::new(),
        }
    }

    fn adjust(&mut self, delta: f64, reason: String) {
        self.score += delta;
        self.findings.push((delta, reason));
    }

    fn unavailable(&mut self, metric: &str) {
        self.findings
            .push((0.0, format!("{metric} data unavailable; scored as neutral")));
    }

    fn finish(mut self) -> FactorScore {
        // Stable: equal impacts keep rule order.
        self.findings
            .sort_by(|a, b| b.0.abs().total_cmp(&a.0.abs()));
        FactorScore {
            factor: self.factor,
            score: round4(self.score.clamp(0.0, 1.0)),
            reasoning: self.findings.into_iter().map(|(_, r)| r).collect(),
        }
    }
}

pub(crate) fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
