// src/matcher/mod.rs
// Keyword/synonym matching over a candidate's searchable text.

pub mod exclusion;

use crate::fetch::CandidateArticle;
use crate::keywords::{normalize, KeywordSet};

pub use exclusion::ExclusionFilter;

/// How a keyword fired. Ordering matters: the reason string lists direct
/// matches before synonym matches before indirect matches, and that order
/// is a documented contract of the read surface, not an implementation
/// detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    /// The literal configured keyword appeared.
    Direct,
    /// Only a registered expansion appeared.
    Synonym,
    /// Multi-token keyword with all tokens present in one field, any order.
    Indirect,
}

#[derive(Debug, Clone)]
pub struct KeywordMatch {
    /// Canonical form of the configured keyword.
    pub canonical: String,
    /// The surface form that actually appeared in the text.
    pub matched_form: String,
    pub kind: MatchKind,
}

/// Derived per candidate, never persisted.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Tier order (direct, synonym, indirect); configuration order within
    /// a tier.
    pub matches: Vec<KeywordMatch>,
    pub pass: bool,
}

impl MatchResult {
    pub fn matched_canonicals(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for keyword_match in &self.matches {
            if !seen.contains(&keyword_match.canonical) {
                seen.push(keyword_match.canonical.clone());
            }
        }
        seen
    }

    /// Human-readable explanation, e.g.
    /// `co2 capture (via carbon dioxide capture), hydrogen`.
    pub fn describe(&self, max_terms: usize) -> String {
        self.matches
            .iter()
            .take(max_terms)
            .map(|m| {
                if m.matched_form == m.canonical {
                    m.canonical.clone()
                } else {
                    format!("{} (via {})", m.canonical, m.matched_form)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Pure matcher over an immutable keyword set; safe to share across
/// concurrent per-journal scans.
pub struct Matcher<'a> {
    keywords: &'a KeywordSet,
}

impl<'a> Matcher<'a> {
    pub fn new(keywords: &'a KeywordSet) -> Self {
        Self { keywords }
    }

    /// Test every configured keyword (and its expansions) against the
    /// candidate's title + abstract. Pass iff at least one keyword fires.
    pub fn match_article(
        &self,
        article: &CandidateArticle,
        journal_keywords: &[String],
    ) -> MatchResult {
        let text = normalize(&article.searchable_text());
        let title = normalize(&article.title);
        let abstract_text = article
            .abstract_text
            .as_deref()
            .map(normalize)
            .unwrap_or_default();

        let mut matches = Vec::new();
        for keyword in journal_keywords {
            let literal = normalize(keyword.trim());
            if literal.is_empty() {
                continue;
            }
            let canonical = self.keywords.canonical_of(keyword);

            if text.contains(&literal) {
                matches.push(KeywordMatch {
                    canonical,
                    matched_form: literal,
                    kind: MatchKind::Direct,
                });
                continue;
            }

            let expansions = self.keywords.expand(keyword);
            if let Some(form) = expansions
                .iter()
                .skip(1) // position 0 is the literal itself
                .find(|form| text.contains(form.as_str()))
            {
                matches.push(KeywordMatch {
                    canonical,
                    matched_form: form.clone(),
                    kind: MatchKind::Synonym,
                });
                continue;
            }

            if let Some(field) = indirect_field(&literal, &title, &abstract_text) {
                matches.push(KeywordMatch {
                    canonical,
                    matched_form: field,
                    kind: MatchKind::Indirect,
                });
            }
        }

        // Stable: configuration order is preserved within each tier.
        matches.sort_by_key(|m| m.kind);
        let pass = !matches.is_empty();
        MatchResult { matches, pass }
    }
}

/// Relaxed-order matching for compound keywords like "energy system
/// optimization": every token present within the same field. Single-token
/// keywords never match indirectly (containment already covered them).
fn indirect_field(literal: &str, title: &str, abstract_text: &str) -> Option<String> {
    let tokens: Vec<&str> = literal.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }
    for field in [title, abstract_text] {
        if !field.is_empty() && tokens.iter().all(|token| field.contains(token)) {
            return Some(literal.to_string());
        }
    }
    None
}
