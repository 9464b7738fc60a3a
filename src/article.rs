//! Typed article record returned by vector stores and consumed by every later stage.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::language::Language;

/// `article_title` value reserved for whole-law summary entries in the index.
pub const LAW_METADATA_SENTINEL: &str = "LAW METADATA";

/// One retrievable unit of legal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Article identifier within its law; stores return it as a number or a string.
    #[serde(default, deserialize_with = "number_or_string")]
    pub article_number: Option<String>,
    /// Short label, or [`LAW_METADATA_SENTINEL`] for non-article records.
    #[serde(default, deserialize_with = "non_blank")]
    pub article_title: Option<String>,
    /// Name of the parent legal instrument.
    #[serde(default, deserialize_with = "non_blank")]
    pub law_title: Option<String>,
    /// Article body used as grounding content.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
    /// Distance reported by the store, when it reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl Article {
    /// Builds an article with the given body and no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            article_number: None,
            article_title: None,
            law_title: None,
            text: text.into(),
            distance: None,
        }
    }

    /// Sets the article number.
    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.article_number = Some(number.into());
        self
    }

    /// Sets the article title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.article_title = Some(title.into());
        self
    }

    /// Sets the parent law title.
    pub fn with_law(mut self, law: impl Into<String>) -> Self {
        self.law_title = Some(law.into());
        self
    }

    /// True for the synthetic whole-law entries that must never be cited.
    pub fn is_law_metadata(&self) -> bool {
        self.article_title
            .as_deref()
            .is_some_and(|title| title.trim() == LAW_METADATA_SENTINEL)
    }

    /// Article number, or an empty string when the store had none.
    pub fn number(&self) -> &str {
        self.article_number.as_deref().unwrap_or("")
    }

    /// Article title, or an empty string when the store had none.
    pub fn title(&self) -> &str {
        self.article_title.as_deref().unwrap_or("")
    }

    /// Law title with the localized placeholder applied.
    pub fn law_title_or_default(&self, language: Language) -> &str {
        self.law_title
            .as_deref()
            .unwrap_or_else(|| language.unknown_law())
    }

    /// Heading shown above the body in the sources list, e.g. `Article 8 - Scope`.
    pub fn display_title(&self, language: Language) -> String {
        let head = format!("{} {}", language.article_label(), self.number());
        let head = head.trim_end();
        match self.article_title.as_deref() {
            Some(title) => format!("{head} - {title}"),
            None => head.to_string(),
        }
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let rendered = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        Some(other) => Some(other.to_string()),
    };
    Ok(rendered.filter(|s| !s.is_empty()))
}

fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_numeric_and_string_numbers() {
        let numeric: Article = serde_json::from_value(json!({
            "article_number": 8,
            "article_title": "نطاق التطبيق",
            "text": "..."
        }))
        .unwrap();
        assert_eq!(numeric.number(), "8");

        let float: Article =
            serde_json::from_value(json!({ "article_number": 12.0, "text": "" })).unwrap();
        assert_eq!(float.number(), "12");

        let string: Article =
            serde_json::from_value(json!({ "article_number": " 8 مكرر ", "text": "" })).unwrap();
        assert_eq!(string.number(), "8 مكرر");
    }

    #[test]
    fn missing_fields_become_none() {
        let article: Article = serde_json::from_value(json!({
            "article_number": null,
            "law_title": "  ",
            "text": null
        }))
        .unwrap();
        assert_eq!(article.article_number, None);
        assert_eq!(article.law_title, None);
        assert_eq!(article.text, "");
        assert_eq!(article.law_title_or_default(Language::English), "Unknown law");
        assert_eq!(
            article.law_title_or_default(Language::Arabic),
            "قانون غير محدد"
        );
    }

    #[test]
    fn sentinel_detection_ignores_surrounding_whitespace() {
        let meta = Article::new("summary").with_title(" LAW METADATA ");
        assert!(meta.is_law_metadata());
        let regular = Article::new("body").with_title("Law metadata handling");
        assert!(!regular.is_law_metadata());
        assert!(!Article::new("untitled").is_law_metadata());
    }

    #[test]
    fn display_title_is_localized() {
        let article = Article::new("...").with_number("8").with_title("Scope");
        assert_eq!(article.display_title(Language::English), "Article 8 - Scope");
        assert_eq!(article.display_title(Language::Arabic), "المادة 8 - Scope");
        assert_eq!(Article::new("...").display_title(Language::English), "Article");
    }
}
