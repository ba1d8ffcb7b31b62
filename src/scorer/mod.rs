// src/scorer/mod.rs
// Relevance scoring. With a user library available, candidates are scored
// by cosine similarity between their TF-IDF vector and the centroid of the
// user's corpus. Without one, every matched candidate gets the fixed
// keyword-fallback score: the keyword match is what produced the candidate
// in the first place.

use std::collections::HashMap;

use tracing::info;

use crate::fetch::CandidateArticle;
use crate::keywords::normalize;
use crate::store::types::CorpusDocument;

/// Score assigned when no user corpus exists.
pub const FALLBACK_SCORE: f64 = 0.5;
pub const FALLBACK_REASON: &str = "keyword match";

/// Tokens shorter than this carry no signal.
const MIN_TOKEN_LEN: usize = 2;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "for",
    "from", "has", "have", "in", "into", "is", "it", "its", "of", "on",
    "or", "such", "that", "the", "their", "then", "there", "these", "this",
    "to", "was", "we", "were", "which", "will", "with",
];

fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn term_frequencies(tokens: &[String]) -> HashMap<String, f64> {
    let mut counts: HashMap<String, f64> = HashMap::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    // Sublinear tf: 1 + ln(count)
    for value in counts.values_mut() {
        *value = 1.0 + value.ln();
    }
    counts
}

/// Term-weighted profile of the user's own library. Titles count three
/// times and tags twice; abstracts and notes once.
#[derive(Debug, Clone)]
pub struct UserProfile {
    /// Corpus centroid, raw tf-idf weights.
    centroid: HashMap<String, f64>,
    centroid_norm: f64,
    /// Smoothed idf over the corpus documents.
    idf: HashMap<String, f64>,
    document_count: usize,
}

impl UserProfile {
    /// None when the corpus is empty or contributes no usable terms.
    pub fn build(corpus: &[CorpusDocument]) -> Option<Self> {
        if corpus.is_empty() {
            return None;
        }

        let document_tokens: Vec<Vec<String>> = corpus
            .iter()
            .map(|doc| {
                let mut text = String::new();
                for _ in 0..3 {
                    text.push_str(&doc.title);
                    text.push(' ');
                }
                if let Some(abstract_text) = &doc.abstract_text {
                    text.push_str(abstract_text);
                    text.push(' ');
                }
                for _ in 0..2 {
                    text.push_str(&doc.tags.join(" "));
                    text.push(' ');
                }
                text.push_str(&doc.notes.join(" "));
                tokenize(&text)
            })
            .collect();

        // Smoothed idf: ln((1 + N) / (1 + df)) + 1
        let document_count = document_tokens.len();
        let mut document_freq: HashMap<String, f64> = HashMap::new();
        for tokens in &document_tokens {
            let mut seen: Vec<&String> = Vec::new();
            for token in tokens {
                if !seen.contains(&token) {
                    seen.push(token);
                    *document_freq.entry(token.clone()).or_insert(0.0) += 1.0;
                }
            }
        }
        let idf: HashMap<String, f64> = document_freq
            .into_iter()
            .map(|(term, df)| {
                let weight = ((1.0 + document_count as f64) / (1.0 + df)).ln() + 1.0;
                (term, weight)
            })
            .collect();

        let mut centroid: HashMap<String, f64> = HashMap::new();
        for tokens in &document_tokens {
            for (term, tf) in term_frequencies(tokens) {
                let weight = tf * idf.get(&term).copied().unwrap_or(1.0);
                *centroid.entry(term).or_insert(0.0) += weight;
            }
        }
        for value in centroid.values_mut() {
            *value /= document_count as f64;
        }

        let centroid_norm = l2_norm(&centroid);
        if centroid_norm == 0.0 {
            return None;
        }

        info!(
            documents = document_count,
            vocabulary = centroid.len(),
            "built user interest profile"
        );
        Some(Self {
            centroid,
            centroid_norm,
            idf,
            document_count,
        })
    }

    fn vectorize(&self, text: &str) -> HashMap<String, f64> {
        let tokens = tokenize(text);
        let mut vector = term_frequencies(&tokens);
        let default_idf = ((1.0 + self.document_count as f64) / 1.0).ln() + 1.0;
        for (term, value) in vector.iter_mut() {
            *value *= self.idf.get(term).copied().unwrap_or(default_idf);
        }
        vector
    }

    /// Cosine similarity against the corpus centroid, clamped to [0, 1].
    /// Zero when the vocabularies share no terms.
    pub fn similarity(&self, text: &str) -> f64 {
        let vector = self.vectorize(text);
        let vector_norm = l2_norm(&vector);
        if vector_norm == 0.0 {
            return 0.0;
        }
        let dot: f64 = vector
            .iter()
            .filter_map(|(term, value)| self.centroid.get(term).map(|c| c * value))
            .sum();
        (dot / (vector_norm * self.centroid_norm)).clamp(0.0, 1.0)
    }

    /// Highest-weight terms the candidate shares with the profile, for the
    /// reason string.
    pub fn shared_terms(&self, text: &str, top_k: usize) -> Vec<String> {
        let vector = self.vectorize(text);
        let mut shared: Vec<(String, f64)> = vector
            .into_iter()
            .filter_map(|(term, value)| {
                self.centroid
                    .get(&term)
                    .map(|centroid_value| (term, value * centroid_value))
            })
            .collect();
        shared.sort_by(|a, b| b.1.total_cmp(&a.1));
        shared.truncate(top_k);
        shared.into_iter().map(|(term, _)| term).collect()
    }
}

fn l2_norm(vector: &HashMap<String, f64>) -> f64 {
    vector.values().map(|v| v * v).sum::<f64>().sqrt()
}

/// The two scoring modes as a tagged variant, so call sites never branch on
/// "is there a profile" themselves.
pub enum ScoringProfile {
    Profile(UserProfile),
    KeywordFallback,
}

impl ScoringProfile {
    pub fn from_corpus(corpus: &[CorpusDocument]) -> Self {
        match UserProfile::build(corpus) {
            Some(profile) => ScoringProfile::Profile(profile),
            None => {
                info!("no user corpus available, using keyword-fallback scoring");
                ScoringProfile::KeywordFallback
            }
        }
    }

    /// Relevance score in [0, 1] plus a human-readable reason. An empty
    /// abstract is fine: the score comes from the title alone.
    pub fn score(&self, article: &CandidateArticle) -> (f64, String) {
        match self {
            ScoringProfile::KeywordFallback => (FALLBACK_SCORE, FALLBACK_REASON.to_string()),
            ScoringProfile::Profile(profile) => {
                let text = article.searchable_text();
                let score = profile.similarity(&text);
                let shared = profile.shared_terms(&text, 3);
                let reason = if shared.is_empty() {
                    format!("profile similarity {score:.2}")
                } else {
                    format!("profile similarity {score:.2}; shared terms: {}", shared.join(", "))
                };
                (score, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus_doc(title: &str, abstract_text: &str, tags: &[&str]) -> CorpusDocument {
        CorpusDocument {
            title: title.to_string(),
            abstract_text: Some(abstract_text.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            notes: Vec::new(),
        }
    }

    fn candidate(title: &str, abstract_text: Option<&str>) -> CandidateArticle {
        CandidateArticle {
            title: title.to_string(),
            abstract_text: abstract_text.map(str::to_string),
            doi: "10.1000/test".to_string(),
            ..Default::default()
        }
    }

    fn capture_corpus() -> Vec<CorpusDocument> {
        vec![
            corpus_doc(
                "Post-combustion CO2 capture with amine solvents",
                "Absorption of carbon dioxide using MEA in packed columns.",
                &["co2 capture", "absorption"],
            ),
            corpus_doc(
                "Techno-economic analysis of calcium looping",
                "Cost assessment of calcium looping for cement plants.",
                &["calcium looping", "tea"],
            ),
        ]
    }

    #[test]
    fn no_corpus_yields_fixed_fallback() {
        let profile = ScoringProfile::from_corpus(&[]);
        let (score, reason) = profile.score(&candidate("Hydrogen storage advances", None));
        assert_eq!(score, FALLBACK_SCORE);
        assert_eq!(reason, "keyword match");
    }

    #[test]
    fn related_candidate_scores_above_unrelated() {
        let profile = UserProfile::build(&capture_corpus()).unwrap();
        let related = profile.similarity("Amine solvent selection for CO2 capture columns");
        let unrelated = profile.similarity("Deep learning for natural language translation");
        assert!(related > unrelated);
        assert!(related > 0.0);
    }

    #[test]
    fn disjoint_vocabulary_scores_zero() {
        let profile = UserProfile::build(&capture_corpus()).unwrap();
        assert_eq!(profile.similarity("ribosomal rna folding kinetics"), 0.0);
    }

    #[test]
    fn identical_text_never_exceeds_one() {
        let corpus = capture_corpus();
        let profile = UserProfile::build(&corpus).unwrap();
        let text = "Post-combustion CO2 capture with amine solvents";
        let score = profile.similarity(text);
        assert!(score <= 1.0);
        assert!(score > 0.3);
    }

    #[test]
    fn empty_abstract_scores_from_title_alone() {
        let profile = ScoringProfile::from_corpus(&capture_corpus());
        let (score, _) = profile.score(&candidate("CO2 capture solvent screening", None));
        assert!(score > 0.0);
    }

    #[test]
    fn reason_names_shared_terms() {
        let profile = ScoringProfile::from_corpus(&capture_corpus());
        let (_, reason) =
            profile.score(&candidate("Calcium looping cost assessment", None));
        assert!(reason.starts_with("profile similarity"));
        assert!(reason.contains("shared terms:"));
    }

    #[test]
    fn empty_documents_fall_back() {
        let corpus = vec![CorpusDocument::default()];
        assert!(matches!(
            ScoringProfile::from_corpus(&corpus),
            ScoringProfile::KeywordFallback
        ));
    }
}
