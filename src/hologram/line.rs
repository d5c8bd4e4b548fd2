use std::fmt;

use serde::{Deserialize, Serialize};

/// One line of a hologram, top line first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HologramLine {
    Text(String),
    // Floating item, identified by its material key
    Item { material: String },
}

impl HologramLine {
    pub fn text(content: impl Into<String>) -> Self {
        HologramLine::Text(content.into())
    }

    pub fn item(material: impl Into<String>) -> Self {
        HologramLine::Item {
            material: material.into(),
        }
    }
}

impl fmt::Display for HologramLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HologramLine::Text(content) => f.write_str(content),
            HologramLine::Item { material } => write!(f, "[{}]", material),
        }
    }
}

impl From<&str> for HologramLine {
    fn from(content: &str) -> Self {
        HologramLine::text(content)
    }
}

impl From<String> for HologramLine {
    fn from(content: String) -> Self {
        HologramLine::Text(content)
    }
}
