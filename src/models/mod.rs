use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A note as stored by the GraphQL backend.
///
/// Field names follow the AppSync schema (camelCase on the wire).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Note {
    pub id: String,
    pub name: String,
    pub description: String,

    #[serde(default)]
    pub completed: bool,

    /// Id of the client instance that created the note.
    /// Notes written by other tools may not carry one.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// The unsaved "new note" form.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct NoteForm {
    pub name: String,
    pub description: String,
}

/// Draft fields, keyed by the `name` attribute of their `<input>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum DraftField {
    Name,
    Description,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum DraftError {
    #[error("please enter a name and description")]
    MissingField,
}

/// Identity of this client instance, stamped on every note it creates so the
/// subscription can drop our own echoes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ClientId(String);

impl ClientId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[cfg(test)]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `note` was created by this instance.
    pub fn owns(&self, note: &Note) -> bool {
        note.client_id.as_deref() == Some(self.0.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct UpdateNoteInput {
    pub id: String,
    pub completed: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct DeleteNoteInput {
    pub id: String,
}

/// `listNotes` connection shape.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct NoteConnection {
    #[serde(default)]
    pub items: Vec<Option<Note>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_note_wire_contract_camel_case() {
        let note = Note {
            id: "n1".to_string(),
            name: "A".to_string(),
            description: "x".to_string(),
            completed: false,
            client_id: Some("c1".to_string()),
        };
        let v = serde_json::to_value(&note).expect("should serialize");
        assert_eq!(v["clientId"], "c1");
        assert_eq!(v["completed"], false);
        assert!(v.get("client_id").is_none());
    }

    #[test]
    fn test_note_deserialize_tolerates_missing_optional_fields() {
        let json = r#"{"id":"n1","name":"A","description":"x","clientId":null}"#;
        let note: Note = serde_json::from_str(json).expect("note should parse");
        assert!(!note.completed);
        assert!(note.client_id.is_none());
    }

    #[test]
    fn test_draft_field_parses_input_names() {
        assert_eq!(DraftField::from_str("name"), Ok(DraftField::Name));
        assert_eq!(
            DraftField::from_str("description"),
            Ok(DraftField::Description)
        );
        assert!(DraftField::from_str("title").is_err());
        assert_eq!(DraftField::Description.as_ref(), "description");
    }

    #[test]
    fn test_client_id_owns_only_its_notes() {
        let me = ClientId::from_string("me");
        let mut note = Note {
            id: "n1".to_string(),
            name: "A".to_string(),
            description: "x".to_string(),
            completed: false,
            client_id: Some("me".to_string()),
        };
        assert!(me.owns(&note));

        note.client_id = Some("peer".to_string());
        assert!(!me.owns(&note));

        note.client_id = None;
        assert!(!me.owns(&note));
    }

    #[test]
    fn test_generated_client_ids_differ() {
        assert_ne!(ClientId::generate(), ClientId::generate());
    }
}
