//! The host document the engine reads from and writes suggestions into.

use std::fmt;

use crate::{
    config::TAGS_FIELD,
    core::SuggestError,
};

pub mod json_note;

pub use json_note::JsonNoteHost;

/// Where a suggestion is written: a field slot, or the note's tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteTarget {
    Field(usize),
    Tags,
}

impl WriteTarget {
    /// Maps a template field name onto the note schema. A real field named
    /// "Tags" takes the slot; otherwise "Tags" means the tag list.
    pub fn resolve(name: &str, field_names: &[String]) -> Option<WriteTarget> {
        if let Some(index) = field_names.iter().position(|n| n == name) {
            return Some(WriteTarget::Field(index));
        }
        if name == TAGS_FIELD {
            return Some(WriteTarget::Tags);
        }
        None
    }
}

impl fmt::Display for WriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteTarget::Field(index) => write!(f, "field {}", index),
            WriteTarget::Tags => f.write_str("tags"),
        }
    }
}

/// The note being edited, as seen by the suggestion engine.
pub trait NoteHost {
    fn field_values(&self) -> Vec<String>;

    /// Parallel to [`NoteHost::field_values`].
    fn field_names(&self) -> Vec<String>;

    fn field_count(&self) -> usize {
        self.field_values().len()
    }

    fn note_type_id(&self) -> String;

    fn set_field(&mut self, index: usize, value: &str) -> Result<(), SuggestError>;

    fn append_tags(&mut self, tags: &[String]) -> Result<(), SuggestError>;

    /// Turns a remote URL into a local media reference, downloading it if needed.
    fn resolve_remote_url(&mut self, url: &str) -> Result<String, SuggestError>;

    /// The field (or tag slot) under edit, if any.
    fn current_target(&self) -> Option<WriteTarget>;

    fn set_current_target(&mut self, target: Option<WriteTarget>);

    /// Reloads the editor view after writes.
    fn refresh(&mut self) -> Result<(), SuggestError>;

    /// Shows a message to the user.
    fn notify(&mut self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_resolve_target() {
        let schema = names(&["Front", "Back", "Example"]);
        assert_eq!(WriteTarget::resolve("Front", &schema), Some(WriteTarget::Field(0)));
        assert_eq!(WriteTarget::resolve("Example", &schema), Some(WriteTarget::Field(2)));
        assert_eq!(WriteTarget::resolve("Tags", &schema), Some(WriteTarget::Tags));
        assert_eq!(WriteTarget::resolve("Missing", &schema), None);
    }

    #[test]
    fn test_real_tags_field_wins() {
        let schema = names(&["Front", "Tags"]);
        assert_eq!(WriteTarget::resolve("Tags", &schema), Some(WriteTarget::Field(1)));
    }
}
