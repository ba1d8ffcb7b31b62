// src/fetch/mod.rs

pub mod crossref;

use async_trait::async_trait;

use crate::store::types::TargetJournal;

pub use crossref::CrossrefClient;

/// A recently published article as returned by the bibliographic source.
/// Transient: candidates are matched and scored per call, never stored
/// directly.
#[derive(Debug, Clone, Default)]
pub struct CandidateArticle {
    pub title: String,
    /// Missing abstracts are common on Crossref; matching and scoring
    /// fall back to the title alone.
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    pub doi: String,
    pub journal: String,
}

impl CandidateArticle {
    /// Title and abstract concatenated: the searchable text the matcher
    /// and scorer operate on.
    pub fn searchable_text(&self) -> String {
        match &self.abstract_text {
            Some(abstract_text) if !abstract_text.is_empty() => {
                format!("{} {}", self.title, abstract_text)
            }
            _ => self.title.clone(),
        }
    }
}

/// Abstract source of "recent articles for journal X". Satisfied by
/// [`CrossrefClient`] in production and by in-memory fakes in tests.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Articles published in `journal` within the last `days` days,
    /// newest first. Partial fields (missing abstract, missing year) must
    /// not fail the call; items without a title are dropped.
    async fn fetch_recent(
        &self,
        journal: &TargetJournal,
        days: i64,
    ) -> anyhow::Result<Vec<CandidateArticle>>;
}
