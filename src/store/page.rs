//! The page record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One record per Markdown file under the content root.
///
/// `url` and `file` are the two lookup keys: `url` is derived from `file` and
/// never mutated independently, `file` locates the record for delete/replace
/// during re-sync. Well-known front matter keys get fields of their own;
/// everything else is carried opaquely in `extra` for the templating boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    /// Set when the record is (re)indexed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Arbitrary additional front matter fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Page {
    pub fn new(url: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file: file.into(),
            title: None,
            description: None,
            keywords: None,
            view: None,
            updated: None,
            extra: BTreeMap::new(),
        }
    }

    /// Assign a front matter value, routing well-known keys to their fields.
    ///
    /// `url` and `file` are derived by the indexer and cannot be overridden
    /// from front matter.
    pub fn set(&mut self, key: &str, value: String) {
        match key {
            "url" | "file" => {}
            "title" => self.title = Some(value),
            "description" => self.description = Some(value),
            "keywords" => self.keywords = Some(value),
            "view" => self.view = Some(value),
            _ => {
                self.extra.insert(key.to_string(), Value::String(value));
            }
        }
    }

    /// Look up any field, well-known or extra, by name.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "url" => Some(Value::String(self.url.clone())),
            "file" => Some(Value::String(self.file.clone())),
            "title" => self.title.clone().map(Value::String),
            "description" => self.description.clone().map(Value::String),
            "keywords" => self.keywords.clone().map(Value::String),
            "view" => self.view.clone().map(Value::String),
            "updated" => self.updated.map(|t| Value::String(t.to_rfc3339())),
            _ => self.extra.get(name).cloned(),
        }
    }
}
