// src/keywords/mod.rs
// Keyword entries and synonym expansion. Built once per process from the
// built-in table plus an optional TOML override file, then shared
// read-only across concurrent matches.

mod builtin;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{EngineError, Result};

/// One configured search term with its alternate surface forms.
/// Immutable after load.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordEntry {
    pub canonical: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// Override file shape:
///
/// ```toml
/// [[keyword]]
/// canonical = "oxy-fuel combustion"
/// synonyms = ["oxyfuel", "oxy-combustion"]
///
/// [exclusion]
/// terms = ["perovskite"]
/// ```
#[derive(Debug, Default, Deserialize)]
struct OverrideFile {
    #[serde(default, rename = "keyword")]
    keywords: Vec<KeywordEntry>,
    #[serde(default)]
    exclusion: Option<ExclusionOverride>,
}

#[derive(Debug, Default, Deserialize)]
struct ExclusionOverride {
    #[serde(default)]
    terms: Vec<String>,
    /// When true, `terms` replaces the built-in list instead of extending it.
    #[serde(default)]
    replace: bool,
}

/// Case-fold and map recognized special characters to an ASCII-safe form.
/// Subscript digits cover chemical notation like CO₂ and H₂O.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '₀' => out.push('0'),
            '₁' => out.push('1'),
            '₂' => out.push('2'),
            '₃' => out.push('3'),
            '₄' => out.push('4'),
            '₅' => out.push('5'),
            '₆' => out.push('6'),
            '₇' => out.push('7'),
            '₈' => out.push('8'),
            '₉' => out.push('9'),
            _ => {
                for lower in ch.to_lowercase() {
                    out.push(lower);
                }
            }
        }
    }
    out
}

/// The full keyword configuration: canonical entries, a form-to-entry
/// reverse index, and the exclusion term list.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    entries: Vec<KeywordEntry>,
    // normalized surface form -> index into `entries`
    by_form: HashMap<String, usize>,
    exclusion_terms: Vec<String>,
}

impl KeywordSet {
    /// Build from the built-in table only.
    pub fn builtin() -> Self {
        let entries = builtin::BUILTIN_SYNONYMS
            .iter()
            .map(|(canonical, synonyms)| KeywordEntry {
                canonical: (*canonical).to_string(),
                synonyms: synonyms.iter().map(|s| (*s).to_string()).collect(),
            })
            .collect();
        let exclusions = builtin::BUILTIN_EXCLUSIONS
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        // The built-in table has no duplicate canonicals.
        Self::from_parts(entries, exclusions).expect("built-in keyword table is duplicate-free")
    }

    /// Build from the built-in table plus a TOML override file.
    pub fn load(overrides_path: Option<&Path>) -> Result<Self> {
        let mut set = Self::builtin();
        let Some(path) = overrides_path else {
            return Ok(set);
        };

        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("cannot read keyword file {}: {e}", path.display()))
        })?;
        let file: OverrideFile = toml::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("invalid keyword file: {e}")))?;

        info!(
            keywords = file.keywords.len(),
            path = %path.display(),
            "applying keyword overrides"
        );

        for entry in file.keywords {
            set.insert(entry)?;
        }
        if let Some(exclusion) = file.exclusion {
            let terms: Vec<String> = exclusion.terms.iter().map(|t| normalize(t)).collect();
            if exclusion.replace {
                set.exclusion_terms = terms;
            } else {
                set.exclusion_terms.extend(terms);
            }
        }
        Ok(set)
    }

    fn from_parts(entries: Vec<KeywordEntry>, exclusion_terms: Vec<String>) -> Result<Self> {
        let mut set = Self {
            entries: Vec::new(),
            by_form: HashMap::new(),
            exclusion_terms: exclusion_terms.iter().map(|t| normalize(t)).collect(),
        };
        for entry in entries {
            set.insert(entry)?;
        }
        Ok(set)
    }

    /// Register an entry, failing fast on a duplicate canonical form rather
    /// than silently overwriting it.
    fn insert(&mut self, entry: KeywordEntry) -> Result<()> {
        let canonical = normalize(&entry.canonical);
        if let Some(&existing) = self.by_form.get(&canonical) {
            if normalize(&self.entries[existing].canonical) == canonical {
                return Err(EngineError::DuplicateKeyword(entry.canonical));
            }
        }

        let index = self.entries.len();
        self.by_form.insert(canonical, index);
        for synonym in &entry.synonyms {
            // A synonym may appear under several canonicals; the first
            // registration wins, matching configuration order.
            self.by_form.entry(normalize(synonym)).or_insert(index);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// All surface forms of `keyword`: the keyword itself first, then its
    /// family (canonical plus synonyms, registration order). An unknown
    /// keyword expands to just itself.
    pub fn expand(&self, keyword: &str) -> Vec<String> {
        let needle = normalize(keyword.trim());
        let mut forms = vec![needle.clone()];

        if let Some(&index) = self.by_form.get(&needle) {
            let entry = &self.entries[index];
            for form in std::iter::once(&entry.canonical).chain(entry.synonyms.iter()) {
                let form = normalize(form);
                if !forms.contains(&form) {
                    forms.push(form);
                }
            }
        }
        forms
    }

    /// The canonical form behind any registered surface form, or the input
    /// itself when unregistered.
    pub fn canonical_of(&self, keyword: &str) -> String {
        let needle = normalize(keyword.trim());
        match self.by_form.get(&needle) {
            Some(&index) => normalize(&self.entries[index].canonical),
            None => needle,
        }
    }

    pub fn exclusion_terms(&self) -> &[String] {
        &self.exclusion_terms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
