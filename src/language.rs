//! Query language detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lower-case Vietnamese letters that carry a diacritic.
const VIETNAMESE_CHARS: &str = "àáạảãâầấậẩẫăằắặẳẵèéẹẻẽêềếệểễìíịỉĩòóọỏõôồốộổỗơờớợởỡùúụủũưừứựửữỳýỵỷỹđ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Vi,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Vi => "vi",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vi" => Ok(Language::Vi),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

/// Common English function words. Vietnamese questions almost never contain
/// them, while English questions about local places almost always do.
const ENGLISH_WORDS: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "best", "can", "do", "does", "for", "from", "get",
    "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "should", "tell", "the",
    "there", "to", "visit", "was", "what", "when", "where", "which", "who", "why", "with",
    "you",
];

fn has_diacritic(word: &str) -> bool {
    word.chars()
        .flat_map(char::to_lowercase)
        .any(|c| VIETNAMESE_CHARS.contains(c))
}

/// Classifies a query by weighing diacritic-bearing words against English
/// function words.
///
/// Place names keep their diacritics in English text ("What is Hạ Long Bay
/// known for?"), so a single marked word is not enough. Vietnamese wins when
/// marked words are at least as common as English function words; text with
/// no marked words is English.
pub fn detect(text: &str) -> Language {
    let mut marked = 0usize;
    let mut english = 0usize;
    for word in text
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
    {
        if has_diacritic(word) {
            marked += 1;
        } else if ENGLISH_WORDS.contains(&word.to_lowercase().as_str()) {
            english += 1;
        }
    }
    if marked > 0 && marked >= english {
        Language::Vi
    } else {
        Language::En
    }
}
