use serde::{Deserialize, Serialize};

use super::{Field, ValidationError, validate_name};

pub type TagId = String;

/// A named, colored spending category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Lowercase hex color, e.g. `#3b5bdb`
    pub color: String,
}

/// Caller-supplied fields for creating or replacing a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDraft {
    pub name: String,
    pub color: String,
}

impl TagDraft {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// Check the draft and return it with the name trimmed and the color normalized.
    pub fn validate(&self) -> Result<TagDraft, ValidationError> {
        validate_name(&self.name)?;
        let color = normalize_color(&self.color)?;
        Ok(TagDraft {
            name: self.name.trim().to_string(),
            color,
        })
    }
}

impl Tag {
    /// Build a tag from an already validated draft.
    pub fn from_draft(id: TagId, draft: TagDraft) -> Self {
        Self {
            id,
            name: draft.name,
            color: draft.color,
        }
    }
}

/// Accepts `#RGB`, `#RRGGBB` and `#RRGGBBAA`, returning the lowercase form.
pub fn normalize_color(color: &str) -> Result<String, ValidationError> {
    let color = color.trim();
    let Some(hex) = color.strip_prefix('#') else {
        return Err(ValidationError::new(
            Field::Color,
            "color must start with '#'",
        ));
    };

    if !matches!(hex.len(), 3 | 6 | 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::new(
            Field::Color,
            format!("'{}' is not a hex color (#RGB, #RRGGBB or #RRGGBBAA)", color),
        ));
    }

    Ok(color.to_ascii_lowercase())
}

/// Swatches offered when picking a tag color, in display order.
pub const TAG_PALETTE: [&str; 6] = [
    "#3b5bdb", // blue
    "#94d82d", // lime
    "#38d9a9", // teal
    "#e03131", // red
    "#cc5de8", // purple
    "#495057", // gray
];

/// Color a new tag gets when none is chosen.
pub const DEFAULT_TAG_COLOR: &str = TAG_PALETTE[0];

/// The predefined categories a fresh ledger starts with, one per palette swatch.
pub fn default_tags() -> Vec<Tag> {
    ["Food", "Entertainment", "Books", "Subscription", "Investment", "Groceries"]
        .into_iter()
        .zip(TAG_PALETTE)
        .enumerate()
        .map(|(i, (name, color))| Tag {
            id: (i + 1).to_string(),
            name: name.to_string(),
            color: color.to_string(),
        })
        .collect()
}
