//! Trade document kinds

use serde::{Deserialize, Serialize};

/// Direction of a trade document: purchases create lots, sales consume them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Purchase,
    Sale,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Purchase => "purchase",
            DocumentKind::Sale => "sale",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(DocumentKind::Purchase),
            "sale" => Some(DocumentKind::Sale),
            _ => None,
        }
    }
}
