// src/fetch/crossref.rs
// Crossref works API client. Only the result shape matters to the engine;
// transport details (filter syntax, JATS markup in abstracts, polite-pool
// User-Agent) stay contained here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::store::types::TargetJournal;

use super::{ArticleSource, CandidateArticle};

static JATS_SUB_SUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?jats:(sub|sup)>").expect("valid regex"));
static JATS_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?jats:[^>]+>").expect("valid regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip JATS XML markup from a Crossref abstract. Subscript/superscript
/// content is kept inline (`CO<jats:sub>2</jats:sub>` becomes `CO2`).
pub fn clean_jats_tags(text: &str) -> String {
    let text = JATS_SUB_SUP.replace_all(text, "");
    let text = JATS_TAG.replace_all(&text, "");
    let text = ANY_TAG.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Debug, Default, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<WorkItem>,
}

#[derive(Debug, Deserialize)]
struct WorkResponse {
    message: WorkItem,
}

#[derive(Debug, Default, Deserialize)]
struct WorkItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    author: Vec<WorkAuthor>,
    published: Option<WorkDate>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl WorkItem {
    /// Items without a title are useless to the matcher and are dropped.
    /// Every other field may be missing.
    fn into_candidate(self) -> Option<CandidateArticle> {
        let title = self.title.into_iter().next()?;
        if title.is_empty() {
            return None;
        }

        let abstract_text = self
            .abstract_text
            .map(|raw| clean_jats_tags(&raw))
            .filter(|cleaned| !cleaned.is_empty());

        let authors = self
            .author
            .into_iter()
            .filter_map(|author| match (author.given, author.family) {
                (Some(given), Some(family)) => Some(format!("{given} {family}")),
                (None, Some(family)) => Some(family),
                _ => None,
            })
            .collect();

        let year = self
            .published
            .as_ref()
            .and_then(|date| date.date_parts.first())
            .and_then(|parts| parts.first())
            .copied()
            .flatten();

        Some(CandidateArticle {
            title,
            abstract_text,
            authors,
            year,
            doi: self.doi.unwrap_or_default(),
            journal: self.container_title.into_iter().next().unwrap_or_default(),
        })
    }
}

pub struct CrossrefClient {
    client: Client,
    api_url: String,
    max_rows: u32,
}

impl CrossrefClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!(
                "paperscout/0.2 (mailto:{})",
                config.crossref_mailto
            ))
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: config.crossref_api_url.clone(),
            max_rows: config.fetch_max_rows,
        })
    }

    async fn request_works(&self, filter: &str) -> Result<Vec<WorkItem>> {
        debug!(filter, "crossref works request");
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("filter", filter),
                ("rows", &self.max_rows.to_string()),
                (
                    "select",
                    "title,abstract,author,published,DOI,container-title,ISSN",
                ),
                ("sort", "published"),
                ("order", "desc"),
            ])
            .send()
            .await
            .context("crossref request failed")?
            .error_for_status()
            .context("crossref returned an error status")?;

        let body: WorksResponse = response
            .json()
            .await
            .context("unexpected crossref response format")?;
        Ok(body.message.items)
    }

    /// Point lookup of a single work by DOI.
    pub async fn fetch_by_doi(&self, doi: &str) -> Result<Option<CandidateArticle>> {
        let url = format!("{}/{}", self.api_url, urlencoding::encode(doi));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("crossref request failed")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: WorkResponse = response
            .error_for_status()
            .context("crossref returned an error status")?
            .json()
            .await
            .context("unexpected crossref response format")?;
        Ok(body.message.into_candidate())
    }
}

#[async_trait]
impl ArticleSource for CrossrefClient {
    async fn fetch_recent(
        &self,
        journal: &TargetJournal,
        days: i64,
    ) -> Result<Vec<CandidateArticle>> {
        let from = (Utc::now() - chrono::Duration::days(days)).format("%Y-%m-%d");
        let filter = match &journal.issn {
            Some(issn) => format!("from-pub-date:{from},issn:{issn}"),
            None => format!("from-pub-date:{from},container-title:\"{}\"", journal.name),
        };

        let mut items = self.request_works(&filter).await?;

        // An ISSN mismatch silently returns nothing; fall back to the
        // journal name once before giving up.
        if items.is_empty() && journal.issn.is_some() {
            warn!(journal = %journal.name, "no results by ISSN, retrying by name");
            let fallback =
                format!("from-pub-date:{from},container-title:\"{}\"", journal.name);
            items = self.request_works(&fallback).await?;
        }

        let candidates: Vec<CandidateArticle> = items
            .into_iter()
            .filter_map(WorkItem::into_candidate)
            .collect();
        info!(
            journal = %journal.name,
            count = candidates.len(),
            days,
            "fetched recent articles"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jats_markup_is_stripped() {
        let raw = "<jats:p>Absorption of CO<jats:sub>2</jats:sub> in MEA.</jats:p>";
        assert_eq!(clean_jats_tags(raw), "Absorption of CO2 in MEA.");
    }

    #[test]
    fn nested_and_unknown_tags_are_removed() {
        let raw = "<jats:sec><jats:title>Abstract</jats:title><p>Text  here</p></jats:sec>";
        assert_eq!(clean_jats_tags(raw), "AbstractText here");
    }

    #[test]
    fn item_without_title_is_dropped() {
        let item = WorkItem {
            doi: Some("10.1000/x".to_string()),
            ..Default::default()
        };
        assert!(item.into_candidate().is_none());
    }

    #[test]
    fn partial_fields_are_tolerated() {
        let item = WorkItem {
            title: vec!["Solvent screening".to_string()],
            author: vec![
                WorkAuthor {
                    given: Some("Ada".to_string()),
                    family: Some("Lovelace".to_string()),
                },
                WorkAuthor {
                    given: None,
                    family: Some("Noether".to_string()),
                },
                WorkAuthor::default(),
            ],
            published: Some(WorkDate {
                date_parts: vec![vec![Some(2025), Some(3)]],
            }),
            ..Default::default()
        };
        let candidate = item.into_candidate().unwrap();
        assert_eq!(candidate.authors, vec!["Ada Lovelace", "Noether"]);
        assert_eq!(candidate.year, Some(2025));
        assert!(candidate.abstract_text.is_none());
        assert!(candidate.doi.is_empty());
    }

    #[test]
    fn empty_abstract_after_cleaning_becomes_none() {
        let item = WorkItem {
            title: vec!["T".to_string()],
            abstract_text: Some("<jats:p></jats:p>".to_string()),
            ..Default::default()
        };
        assert!(item.into_candidate().unwrap().abstract_text.is_none());
    }
}
