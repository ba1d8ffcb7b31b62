// src/matcher/exclusion.rs
// Optional post-filter applied after keyword matching and before scoring.
// Catalyst-family papers pass the inclusion keywords all the time (they
// share the CO2/hydrogen vocabulary) but are out of profile, so they are
// dropped on plain substring hits. The synonym table is never consulted
// here.

use tracing::debug;

use crate::fetch::CandidateArticle;
use crate::keywords::{normalize, KeywordSet};

pub struct ExclusionFilter {
    terms: Vec<String>,
    enabled: bool,
}

impl ExclusionFilter {
    pub fn from_keyword_set(keywords: &KeywordSet, enabled: bool) -> Self {
        Self {
            terms: keywords.exclusion_terms().to_vec(),
            enabled,
        }
    }

    #[cfg(test)]
    fn from_terms(terms: &[&str]) -> Self {
        Self {
            terms: terms.iter().map(|t| normalize(t)).collect(),
            enabled: true,
        }
    }

    /// Exclusion terms found in the candidate's searchable text. Empty when
    /// the filter is disabled or nothing matched.
    pub fn matched_terms(&self, article: &CandidateArticle) -> Vec<&str> {
        if !self.enabled {
            return Vec::new();
        }
        let text = normalize(&article.searchable_text());
        self.terms
            .iter()
            .filter(|term| text.contains(term.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn should_exclude(&self, article: &CandidateArticle) -> bool {
        let matched = self.matched_terms(article);
        if !matched.is_empty() {
            debug!(
                title = %article.title,
                terms = ?&matched[..matched.len().min(3)],
                "candidate excluded"
            );
            return true;
        }
        false
    }
}
