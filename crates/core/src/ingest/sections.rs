//! Maps scraped section tables onto the typed company record.

use crate::domain::company::{
    Announcement, BasicData, FinancialRatios, Metric, QuarterlyResult, RawCompanyData,
    ShareholdingPattern,
};
use crate::ingest::normalize::{
    parse_amount, parse_amount_in, parse_date, parse_holding, parse_percent, parse_ratio, Unit,
};
use crate::ingest::source::SectionTable;

const MAX_QUARTERS: usize = 8;
const YOY_LAG: usize = 4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overview {
    pub basic: BasicData,
    pub roe: Metric,
    pub roce: Metric,
}

pub fn parse_overview(table: &SectionTable) -> Overview {
    let mut out = Overview::default();
    for row in &table.rows {
        let Some(label) = row.first() else { continue };
        let value = latest_value(row);
        match label_key(label).as_str() {
            "current_price" | "price" => out.basic.current_price = parse_amount(value),
            "market_cap" => out.basic.market_cap = parse_amount(value),
            "stock_p_e" | "p_e" | "pe_ratio" | "price_to_earning" | "price_to_earnings" => {
                out.basic.pe_ratio = parse_ratio(value)
            }
            "price_to_book" | "price_to_book_value" | "p_b" | "pb_ratio" => {
                out.basic.pb_ratio = parse_ratio(value)
            }
            "dividend_yield" => out.basic.dividend_yield = parse_percent(value),
            "book_value" => out.basic.book_value = parse_amount(value),
            "roe" | "return_on_equity" => out.roe = parse_percent(value),
            "roce" | "return_on_capital_employed" => out.roce = parse_percent(value),
            _ => {}
        }
    }

    if !out.basic.pb_ratio.is_available() {
        if let (Some(price), Some(book)) = (
            out.basic.current_price.value(),
            out.basic.book_value.value(),
        ) {
            if book > 0.0 {
                out.basic.pb_ratio = Metric::Value(price / book);
            }
        }
    }
    out
}

pub fn parse_ratios(table: &SectionTable) -> FinancialRatios {
    let mut out = FinancialRatios::default();
    for row in &table.rows {
        let Some(label) = row.first() else { continue };
        let value = latest_value(row);
        match label_key(label).as_str() {
            "roe" | "return_on_equity" => out.roe = parse_percent(value),
            "roce" | "return_on_capital_employed" => out.roce = parse_percent(value),
            "debt_to_equity" | "debt_equity" | "d_e" => out.debt_to_equity = parse_ratio(value),
            "current_ratio" => out.current_ratio = parse_ratio(value),
            "interest_coverage" | "interest_coverage_ratio" => {
                out.interest_coverage = parse_ratio(value)
            }
            "asset_turnover" | "asset_turnover_ratio" => out.asset_turnover = parse_ratio(value),
            _ => {}
        }
    }
    out
}

/// Quarter tables are published oldest-first with one column per period; the result is
/// most-recent-first with YoY growth filled from the quarter four periods earlier when the
/// table does not publish it.
pub fn parse_quarterly_results(table: &SectionTable) -> Vec<QuarterlyResult> {
    let columns = table
        .rows
        .iter()
        .map(|r| r.len().saturating_sub(1))
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }

    let mut quarters: Vec<QuarterlyResult> = (0..columns)
        .map(|i| QuarterlyResult {
            period: table
                .headers
                .get(i + 1)
                .map(|h| h.trim().to_string())
                .unwrap_or_default(),
            revenue: Metric::Unavailable,
            net_profit: Metric::Unavailable,
            eps: Metric::Unavailable,
            revenue_growth: Metric::Unavailable,
            profit_growth: Metric::Unavailable,
        })
        .collect();

    for row in &table.rows {
        let Some(label) = row.first() else { continue };
        let key = label_key(label);
        for (i, cell) in row.iter().skip(1).enumerate() {
            let q = &mut quarters[i];
            match key.as_str() {
                "sales" | "revenue" | "revenue_from_operations" => {
                    q.revenue = parse_amount_in(cell, Unit::Crore)
                }
                "net_profit" => q.net_profit = parse_amount_in(cell, Unit::Crore),
                "eps_in_rs" | "eps" => q.eps = parse_amount(cell),
                "yoy_sales_growth" | "sales_growth" | "revenue_growth" => {
                    q.revenue_growth = parse_percent(cell)
                }
                "yoy_profit_growth" | "profit_growth" | "net_profit_growth" => {
                    q.profit_growth = parse_percent(cell)
                }
                _ => {}
            }
        }
    }

    // YoY bases are by column position, so derive growth before blank columns go.
    for i in YOY_LAG..quarters.len() {
        let base = &quarters[i - YOY_LAG];
        let revenue_growth = growth_pct(quarters[i].revenue, base.revenue);
        let profit_growth = growth_pct(quarters[i].net_profit, base.net_profit);
        let q = &mut quarters[i];
        q.revenue_growth = q.revenue_growth.or(revenue_growth);
        q.profit_growth = q.profit_growth.or(profit_growth);
    }

    quarters.retain(|q| {
        q.revenue.is_available() || q.net_profit.is_available() || q.eps.is_available()
    });
    quarters.reverse();
    quarters.truncate(MAX_QUARTERS);
    quarters
}

pub fn parse_shareholding(table: &SectionTable) -> ShareholdingPattern {
    let mut out = ShareholdingPattern::default();
    let mut institutional = Metric::Unavailable;
    let mut fii = Metric::Unavailable;
    let mut dii = Metric::Unavailable;

    for row in &table.rows {
        let Some(label) = row.first() else { continue };
        let value = parse_holding(latest_value(row));
        match label_key(label).as_str() {
            "promoters" | "promoter" | "promoter_holding" => out.promoter = value,
            "public" | "public_holding" => out.public = value,
            "institutions" | "institutional" | "institutional_holding"
            | "institutional_investors" => institutional = value,
            "fiis" | "fii" | "foreign_institutions" => fii = value,
            "diis" | "dii" | "domestic_institutions" => dii = value,
            _ => {}
        }
    }

    out.institutional = institutional.or(match (fii.value(), dii.value()) {
        (None, None) => Metric::Unavailable,
        (f, d) => {
            let total = f.unwrap_or(0.0) + d.unwrap_or(0.0);
            if total <= 100.0 {
                Metric::Value(total)
            } else {
                Metric::Unavailable
            }
        }
    });
    out
}

/// Most recent first; undated entries keep page order after dated ones.
pub fn parse_announcements(table: &SectionTable) -> Vec<Announcement> {
    let mut out: Vec<Announcement> = table
        .rows
        .iter()
        .filter_map(|row| {
            let cells: Vec<&str> = row
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect();
            let (date, text) = match cells.split_first() {
                Some((first, rest)) if !rest.is_empty() => match parse_date(first) {
                    Some(d) => (Some(d), rest.join(" ")),
                    None => (None, cells.join(" ")),
                },
                Some(_) => (None, cells.join(" ")),
                None => return None,
            };
            Some(Announcement { date, text })
        })
        .collect();
    out.sort_by(|a, b| match (a.date, b.date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    out
}

pub fn parse_credit_ratings(table: &SectionTable) -> Vec<String> {
    table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn merge_overview(data: &mut RawCompanyData, overview: Overview) {
    data.basic = overview.basic;
    data.ratios.roe = data.ratios.roe.or(overview.roe);
    data.ratios.roce = data.ratios.roce.or(overview.roce);
}

fn growth_pct(current: Metric, base: Metric) -> Metric {
    match (current.value(), base.value()) {
        (Some(c), Some(b)) if b != 0.0 => Metric::Value((c - b) / b.abs() * 100.0),
        _ => Metric::Unavailable,
    }
}

fn latest_value(row: &[String]) -> &str {
    row.iter()
        .skip(1)
        .rev()
        .map(|c| c.trim())
        .find(|c| !c.is_empty())
        .unwrap_or("")
}

/// "Sales +" -> "sales", "Stock P/E" -> "stock_p_e", "ROE %" -> "roe".
fn label_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    for c in label.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            key.push(c);
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_matches('_').to_string()
}
