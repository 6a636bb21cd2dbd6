//! [`ListingSource`] backed by screener.in company pages.

use crate::config::Settings;
use crate::domain::company::Section;
use crate::domain::query::collapse_whitespace;
use crate::ingest::source::{ListingCandidate, ListingSource, SectionTable};
use anyhow::{anyhow, Context, Result};
use dashmap::DashMap;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 stockpick/0.1";

// All six sections live on one page; keep it around long enough to serve one extraction.
const PAGE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct SearchHit {
    name: String,
    url: String,
}

#[derive(Debug)]
pub struct ScreenerClient {
    http: reqwest::Client,
    base_url: String,
    pages: DashMap<String, (Instant, Arc<str>)>,
}

impl ScreenerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build screener http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            pages: DashMap::new(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.base_url, settings.request_timeout)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read response from {url}"))?;
        if !status.is_success() {
            anyhow::bail!("screener HTTP {status} for {url}");
        }
        Ok(text)
    }

    async fn page(&self, listing_id: &str) -> Result<Arc<str>> {
        let now = Instant::now();
        if let Some(hit) = self.pages.get(listing_id) {
            if now.duration_since(hit.0) < PAGE_TTL {
                return Ok(hit.1.clone());
            }
        }

        let url = format!("{}{}", self.base_url, listing_id);
        let html: Arc<str> = self.get_text(&url).await?.into();
        self.pages.retain(|_, (at, _)| now.duration_since(*at) < PAGE_TTL);
        self.pages
            .insert(listing_id.to_string(), (Instant::now(), html.clone()));
        tracing::debug!(%url, bytes = html.len(), "fetched company page");
        Ok(html)
    }
}

#[async_trait::async_trait]
impl ListingSource for ScreenerClient {
    fn source_name(&self) -> &'static str {
        "screener"
    }

    async fn search(&self, name: &str) -> Result<Vec<ListingCandidate>> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/api/company/search/", self.base_url),
            &[("q", name)],
        )
        .context("invalid screener base url")?;
        let body = self.get_text(url.as_str()).await?;
        parse_search(&body)
    }

    async fn fetch_section(&self, listing_id: &str, section: Section) -> Result<SectionTable> {
        let html = self.page(listing_id).await?;
        extract_section(&html, section)
            .with_context(|| format!("could not read {section} from {listing_id}"))
    }
}

/// Company hits from the search API, in the order returned. Non-company hits (full-text search
/// links) are skipped.
pub fn parse_search(body: &str) -> Result<Vec<ListingCandidate>> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).context("unexpected screener search payload")?;
    Ok(hits
        .into_iter()
        .filter(|h| h.url.starts_with("/company/"))
        .map(|h| ListingCandidate {
            display_name: collapse_whitespace(&h.name),
            listing_id: h.url,
        })
        .collect())
}

pub fn extract_section(html: &str, section: Section) -> Result<SectionTable> {
    let doc = Html::parse_document(html);
    let table = match section {
        Section::Overview => top_ratios(&doc)?,
        Section::QuarterlyResults => data_table(&doc, "section#quarters")?,
        Section::Ratios => data_table(&doc, "section#ratios")?,
        Section::Shareholding => data_table(&doc, "section#shareholding")?,
        Section::Announcements => list_items(&doc, "#documents .announcements")?,
        Section::CreditRatings => list_items(&doc, "#documents .credit-ratings")?,
    };
    if table.is_empty() {
        return Err(anyhow!("{section} is empty on the page"));
    }
    Ok(table)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("bad selector {css:?}: {e}"))
}

fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn top_ratios(doc: &Html) -> Result<SectionTable> {
    let item = selector("#top-ratios li")?;
    let name = selector(".name")?;
    let value = selector(".value")?;

    let rows: Vec<Vec<String>> = doc
        .select(&item)
        .filter_map(|li| {
            let label = li.select(&name).next().map(text_of)?;
            let value = li.select(&value).next().map(text_of).unwrap_or_default();
            Some(vec![label, value])
        })
        .collect();
    if rows.is_empty() {
        return Err(anyhow!("no #top-ratios on the page"));
    }
    Ok(SectionTable {
        headers: Vec::new(),
        rows,
    })
}

fn data_table(doc: &Html, scope: &str) -> Result<SectionTable> {
    let table_sel = selector(&format!("{scope} table"))?;
    let th = selector("thead th")?;
    let tr = selector("tbody tr")?;
    let td = selector("td")?;

    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| anyhow!("no table under {scope}"))?;
    let headers = table.select(&th).map(text_of).collect();
    let rows = table
        .select(&tr)
        .map(|row| row.select(&td).map(text_of).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();
    Ok(SectionTable { headers, rows })
}

fn list_items(doc: &Html, scope: &str) -> Result<SectionTable> {
    let scope_sel = selector(scope)?;
    let li = selector("li")?;
    let date = selector(".ink-600")?;

    let container = doc
        .select(&scope_sel)
        .next()
        .ok_or_else(|| anyhow!("no {scope} on the page"))?;
    let rows = container
        .select(&li)
        .map(|item| {
            let full = text_of(item);
            match item.select(&date).next().map(text_of) {
                // "<title> <date - summary>": put the date cell first like a table row.
                Some(meta) if !meta.is_empty() => {
                    let title = full.strip_suffix(meta.as_str()).unwrap_or(&full).trim();
                    let (when, summary) = meta.split_once(" - ").unwrap_or((meta.as_str(), ""));
                    let text = [title, summary]
                        .iter()
                        .filter(|s| !s.is_empty())
                        .copied()
                        .collect::<Vec<_>>()
                        .join(" - ");
                    vec![when.trim().to_string(), text]
                }
                _ => vec![full],
            }
        })
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();
    Ok(SectionTable {
        headers: Vec::new(),
        rows,
    })
}
