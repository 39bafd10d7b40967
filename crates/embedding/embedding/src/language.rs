//! Language hint derived from the message text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language of an inquiry. Selects the remote embedding model and the similarity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl Language {
    /// `Zh` if the text contains any CJK unified ideograph, otherwise `En`.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(is_cjk_ideograph) {
            Language::Zh
        } else {
            Language::En
        }
    }

    /// Wire code sent to the embedding service (`"en"` / `"zh"`).
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    /// Minimum similarity a candidate must strictly exceed to be accepted.
    pub fn similarity_threshold(self) -> f32 {
        match self {
            Language::En => 0.65,
            Language::Zh => 0.625,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}
