
use crate::domain::company::{Metric, QuarterlyResult, RawCompanyData, Section};
use crate::error::PipelineError;
use crate::ingest::extractor::CompanyExtractor;
use crate::ingest::sections;
use crate::ingest::source::{ListingCandidate, ListingSource, SectionTable};
use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 9, 15, 0).unwrap()
}

pub fn sample_company(name: &str) -> RawCompanyData {
    RawCompanyData::empty(
        name,
        format!("/company/{}/", name.to_uppercase().replace(' ', "")),
        fixed_time(),
    )
}

pub fn healthy_company() -> RawCompanyData {
    let tables = healthy_tables();
    let mut data = sample_company("Acme Industries Ltd");
    data.ratios = sections::parse_ratios(&tables[&Section::Ratios]);
    data.quarterly_results = sections::parse_quarterly_results(&tables[&Section::QuarterlyResults]);
    data.shareholding = sections::parse_shareholding(&tables[&Section::Shareholding]);
    data.announcements = sections::parse_announcements(&tables[&Section::Announcements]);
    data.credit_ratings = sections::parse_credit_ratings(&tables[&Section::CreditRatings]);
    sections::merge_overview(
        &mut data,
        sections::parse_overview(&tables[&Section::Overview]),
    );
    data
}

/// Strong ROE, revenue growth and promoter holding; every other metric either sits inside its
/// neutral band or, with `in_band_others == false`, is unavailable.
pub fn headline_company(in_band_others: bool) -> RawCompanyData {
    let mut data = sample_company("Acme Industries Ltd");
    data.ratios.roe = Metric::Value(24.5);
    data.shareholding.promoter = Metric::Value(45.3);
    let mut latest = QuarterlyResult {
        period: "Dec 2024".to_string(),
        revenue: Metric::Unavailable,
        net_profit: Metric::Unavailable,
        eps: Metric::Unavailable,
        revenue_growth: Metric::Value(18.2),
        profit_growth: Metric::Unavailable,
    };
    if in_band_others {
        data.ratios.debt_to_equity = Metric::Value(0.75);
        data.ratios.current_ratio = Metric::Value(1.2);
        data.ratios.interest_coverage = Metric::Value(3.0);
        data.ratios.roce = Metric::Value(12.0);
        data.ratios.asset_turnover = Metric::Value(1.0);
        data.basic.pe_ratio = Metric::Value(30.0);
        data.basic.pb_ratio = Metric::Value(2.0);
        data.basic.dividend_yield = Metric::Value(1.0);
        data.shareholding.institutional = Metric::Value(10.0);
        latest.revenue = Metric::Value(1000.0);
        latest.net_profit = Metric::Value(100.0);
        latest.profit_growth = Metric::Value(0.0);
    }
    data.quarterly_results = vec![latest];
    data
}

fn table(headers: &[&str], rows: &[&[&str]]) -> SectionTable {
    SectionTable {
        headers: headers.iter().map(|s| s.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    }
}

pub fn healthy_tables() -> HashMap<Section, SectionTable> {
    HashMap::from([
        (
            Section::Overview,
            table(
                &[],
                &[
                    &["Market Cap", "₹ 45,000 Cr."],
                    &["Current Price", "₹ 250"],
                    &["Stock P/E", "18.0"],
                    &["Book Value", "₹ 100"],
                    &["Dividend Yield", "1.0 %"],
                    &["ROCE", "22.0 %"],
                    &["ROE", "24.5 %"],
                ],
            ),
        ),
        (
            Section::Ratios,
            table(
                &["", "Mar 2023", "Mar 2024"],
                &[
                    &["ROCE %", "20%", "22%"],
                    &["ROE %", "22.1%", "24.5%"],
                    &["Debt to equity", "0.35", "0.30"],
                    &["Current ratio", "1.7", "1.8"],
                    &["Interest Coverage", "7.5", "8.0"],
                    &["Asset Turnover", "1.1", "1.2"],
                ],
            ),
        ),
        (
            Section::QuarterlyResults,
            table(
                &["", "Dec 2023", "Mar 2024", "Jun 2024", "Sep 2024", "Dec 2024"],
                &[
                    &["Sales +", "820", "850", "900", "950", "1,000"],
                    &["Net Profit +", "140", "150", "160", "170", "180"],
                    &["EPS in Rs", "7.0", "7.5", "8.0", "8.5", "9.0"],
                    &["YoY Sales Growth %", "", "", "", "", "18.2%"],
                    &["YoY Profit Growth %", "", "", "", "", "22.0%"],
                ],
            ),
        ),
        (
            Section::Shareholding,
            table(
                &["", "Sep 2024", "Dec 2024"],
                &[
                    &["Promoters +", "45.10%", "45.30%"],
                    &["FIIs +", "15.80%", "16.00%"],
                    &["DIIs +", "10.20%", "10.50%"],
                    &["Public +", "28.90%", "28.20%"],
                ],
            ),
        ),
        (
            Section::Announcements,
            table(
                &[],
                &[
                    &["14 Jan 2025", "Board meeting outcome for Q3 results"],
                    &["02 Dec 2024", "Analyst meet intimation"],
                ],
            ),
        ),
        (
            Section::CreditRatings,
            table(&[], &[&["CRISIL AA+ / Stable"]]),
        ),
    ])
}

/// In-memory [`ListingSource`] that counts calls and can inject failures or latency per section.
pub struct StubSource {
    candidates: Vec<ListingCandidate>,
    tables: HashMap<Section, SectionTable>,
    failures: Mutex<HashMap<Section, u32>>,
    latency: HashMap<Section, Duration>,
    search_calls: AtomicUsize,
    fetch_calls: Mutex<HashMap<Section, usize>>,
}

impl StubSource {
    pub fn new(names: &[&str], tables: HashMap<Section, SectionTable>) -> Self {
        Self {
            candidates: names
                .iter()
                .map(|n| ListingCandidate {
                    display_name: n.to_string(),
                    listing_id: format!("/company/{}/", n.to_uppercase().replace(' ', "")),
                })
                .collect(),
            tables,
            failures: Mutex::new(HashMap::new()),
            latency: HashMap::new(),
            search_calls: AtomicUsize::new(0),
            fetch_calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn failing(self, section: Section, times: u32) -> Self {
        self.failures.lock().unwrap().insert(section, times);
        self
    }

    pub fn with_latency(mut self, section: Section, latency: Duration) -> Self {
        self.latency.insert(section, latency);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.lock().unwrap().values().sum()
    }

    pub fn fetch_calls_for(&self, section: Section) -> usize {
        self.fetch_calls
            .lock()
            .unwrap()
            .get(&section)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl ListingSource for StubSource {
    fn source_name(&self) -> &'static str {
        "stub"
    }

    async fn search(&self, _name: &str) -> Result<Vec<ListingCandidate>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.clone())
    }

    async fn fetch_section(&self, _listing_id: &str, section: Section) -> Result<SectionTable> {
        *self.fetch_calls.lock().unwrap().entry(section).or_default() += 1;
        if let Some(latency) = self.latency.get(&section) {
            tokio::time::sleep(*latency).await;
        }
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&section) {
                if *left > 0 {
                    *left -= 1;
                    return Err(anyhow!("stub failure for {section}"));
                }
            }
        }
        Ok(self.tables.get(&section).cloned().unwrap_or_default())
    }
}

pub struct CountingExtractor {
    data: Option<RawCompanyData>,
    latency: Duration,
    calls: AtomicUsize,
}

impl CountingExtractor {
    pub fn new(data: Option<RawCompanyData>, latency: Duration) -> Self {
        Self {
            data,
            latency,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CompanyExtractor for CountingExtractor {
    async fn extract(&self, company_name: &str) -> Result<RawCompanyData, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.data
            .clone()
            .ok_or_else(|| PipelineError::CompanyNotFound {
                company: company_name.to_string(),
            })
    }
}
