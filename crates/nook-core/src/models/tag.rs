//! Tag model
//!
//! Tags are a local catalogue only; notes reference them by id and the
//! catalogue itself never leaves the device.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A coloured label for organizing notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// CSS hex colour, e.g. `#3b82f6`
    pub color: String,
}

impl Tag {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: TagId(id.into()),
            name: name.into(),
            color: color.into(),
        }
    }
}

/// The tag catalogue every fresh client starts with.
#[must_use]
pub fn default_tags() -> Vec<Tag> {
    vec![
        Tag::new("tag-1", "Work", "#ec4899"),
        Tag::new("tag-2", "Personal", "#3b82f6"),
        Tag::new("tag-3", "Ideas", "#f59e0b"),
        Tag::new("tag-4", "Urgent", "#ef4444"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tags_have_distinct_ids() {
        let tags = default_tags();
        assert_eq!(tags.len(), 4);
        assert!(tags.iter().any(|tag| tag.name == "Urgent" && tag.color == "#ef4444"));
        let mut ids = tags.iter().map(|tag| tag.id.clone()).collect::<Vec<_>>();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
