//! Boundary where scraped text becomes typed values.
//!
//! Every function here is total: malformed input yields [`Metric::Unavailable`], never an error
//! and never a silent zero.

use crate::domain::company::Metric;
use chrono::NaiveDate;

const CRORE: f64 = 10_000_000.0;
const LAKH: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Absolute,
    Lakh,
    Crore,
}

impl Unit {
    fn multiplier(self) -> f64 {
        match self {
            Unit::Absolute => 1.0,
            Unit::Lakh => LAKH,
            Unit::Crore => CRORE,
        }
    }
}

/// Currency amount converted to an absolute value ("₹ 1,234 Cr." -> 12_340_000_000).
pub fn parse_amount(text: &str) -> Metric {
    parse_amount_in(text, Unit::Absolute)
}

/// Like [`parse_amount`], but bare numbers are interpreted in `default_unit` (tables published
/// "in Rs. Crores" carry no per-cell suffix).
pub fn parse_amount_in(text: &str, default_unit: Unit) -> Metric {
    match clean(text) {
        Some((value, unit)) => Metric::from(Some(value * unit.unwrap_or(default_unit).multiplier())),
        None => Metric::Unavailable,
    }
}

pub fn parse_percent(text: &str) -> Metric {
    match clean(text) {
        Some((value, None)) => Metric::Value(value),
        _ => Metric::Unavailable,
    }
}

pub fn parse_holding(text: &str) -> Metric {
    match parse_percent(text) {
        Metric::Value(v) if (0.0..=100.0).contains(&v) => Metric::Value(v),
        _ => Metric::Unavailable,
    }
}

pub fn parse_ratio(text: &str) -> Metric {
    let t = text.trim();
    let t = t
        .strip_suffix('x')
        .or_else(|| t.strip_suffix('X'))
        .unwrap_or(t);
    parse_percent(t)
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let t = text.trim().trim_end_matches(['-', '|', ':']).trim();
    const FORMATS: [&str; 5] = ["%d %b %Y", "%d %B %Y", "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
}

fn clean(text: &str) -> Option<(f64, Option<Unit>)> {
    let mut t = text.trim().to_lowercase();
    if matches!(t.as_str(), "" | "-" | "--" | "—" | "n/a" | "na" | "nil") {
        return None;
    }

    for prefix in ["₹", "rs.", "rs", "inr"] {
        if let Some(rest) = t.strip_prefix(prefix) {
            t = rest.trim_start().to_string();
            break;
        }
    }

    let mut t: String = t
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '%' && *c != '₹')
        .map(|c| if c == '−' { '-' } else { c })
        .collect();
    while t.ends_with('.') {
        t.pop();
    }

    let mut unit = None;
    for (suffix, u) in [
        ("crores", Unit::Crore),
        ("crore", Unit::Crore),
        ("cr", Unit::Crore),
        ("lakhs", Unit::Lakh),
        ("lakh", Unit::Lakh),
        ("lacs", Unit::Lakh),
        ("lac", Unit::Lakh),
        ("l", Unit::Lakh),
    ] {
        if let Some(rest) = t.strip_suffix(suffix) {
            t = rest.to_string();
            unit = Some(u);
            break;
        }
    }

    let negative = t.starts_with('(') && t.ends_with(')');
    let digits = if negative { &t[1..t.len() - 1] } else { t.as_str() };
    if digits.is_empty() || !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let value = digits.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some((if negative { -value } else { value }, unit))
}
