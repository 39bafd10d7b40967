//! Keyword rule model: a group of trigger terms mapped to a canned response.
//!
//! Maps to the `keywords` table (`keyword` column holds the comma-joined group).

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Ordered set of trigger terms. Comma-separated at the boundary; empty terms are dropped.
///
/// Each term is compiled to a whole-word matcher when it enters the group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordGroup {
    terms: Vec<String>,
    patterns: Vec<Option<Regex>>,
}

impl KeywordGroup {
    /// Parses `"hi, hello"` into `["hi", "hello"]`. Duplicate terms (case-insensitive) are kept once.
    pub fn parse(raw: &str) -> Self {
        let mut group = Self::default();
        group.extend(raw);
        group
    }

    /// Appends the terms in `raw` (comma-separated) that are not already present.
    pub fn extend(&mut self, raw: &str) {
        for term in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if !self.contains(term) {
                self.patterns.push(whole_word(term));
                self.terms.push(term.to_string());
            }
        }
    }

    /// Removes `term` (case-insensitive). Returns false if it was not in the group.
    pub fn remove(&mut self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        let Some(at) = self.terms.iter().position(|t| t.to_lowercase() == term) else {
            return false;
        };
        self.terms.remove(at);
        self.patterns.remove(at);
        true
    }

    pub fn contains(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        self.terms.iter().any(|t| t.to_lowercase() == term)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Column representation: terms joined with `,`.
    pub fn to_column(&self) -> String {
        self.terms.join(",")
    }

    /// True iff every term occurs in `text` as a case-insensitive whole word.
    /// An empty group never matches; neither does a term that failed to compile.
    pub fn matches(&self, text: &str) -> bool {
        !self.patterns.is_empty()
            && self
                .patterns
                .iter()
                .all(|p| p.as_ref().is_some_and(|re| re.is_match(text)))
    }
}

fn whole_word(term: &str) -> Option<Regex> {
    match RegexBuilder::new(&format!(r"\b{}\b", regex::escape(term)))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Keyword term {:?} cannot be compiled: {}", term, e);
            None
        }
    }
}

impl PartialEq for KeywordGroup {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl Eq for KeywordGroup {}

impl From<Vec<String>> for KeywordGroup {
    fn from(terms: Vec<String>) -> Self {
        let mut group = Self::default();
        for term in terms {
            group.extend(&term);
        }
        group
    }
}

impl From<KeywordGroup> for Vec<String> {
    fn from(group: KeywordGroup) -> Self {
        group.terms
    }
}

/// A persisted keyword rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub id: i64,
    pub group: KeywordGroup,
    pub response: String,
}

impl KeywordRule {
    pub fn matches(&self, text: &str) -> bool {
        self.group.matches(text)
    }
}
