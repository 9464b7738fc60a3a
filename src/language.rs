//! Script-based language detection used to localize prompts and labels.

use serde::Serialize;

/// Languages the assistant localizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Arabic script questions.
    Arabic,
    /// Everything else; prompts still ask the model to mirror the question.
    English,
}

impl Language {
    /// Picks Arabic when Arabic letters outnumber Latin ones.
    pub fn detect(text: &str) -> Self {
        let mut arabic = 0usize;
        let mut latin = 0usize;
        for ch in text.chars() {
            if is_arabic(ch) {
                arabic += 1;
            } else if ch.is_ascii_alphabetic() {
                latin += 1;
            }
        }
        if arabic > 0 && arabic >= latin {
            Language::Arabic
        } else {
            Language::English
        }
    }

    /// English name of the language, as written into instructions.
    pub fn name(self) -> &'static str {
        match self {
            Language::Arabic => "Arabic",
            Language::English => "English",
        }
    }

    /// Word used before an article number ("Article 8", "المادة 8").
    pub fn article_label(self) -> &'static str {
        match self {
            Language::Arabic => "المادة",
            Language::English => "Article",
        }
    }

    /// Label for the parent instrument line in serialized context.
    pub fn law_label(self) -> &'static str {
        match self {
            Language::Arabic => "القانون",
            Language::English => "Law",
        }
    }

    /// Placeholder for records without a law title.
    pub fn unknown_law(self) -> &'static str {
        match self {
            Language::Arabic => "قانون غير محدد",
            Language::English => "Unknown law",
        }
    }
}

fn is_arabic(ch: char) -> bool {
    matches!(ch,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}

/// True when any character of `text` is in an Arabic block.
pub fn contains_arabic(text: &str) -> bool {
    text.chars().any(is_arabic)
}
