use crate::api::{ApiError, ApiErrorKind, ApiResult};
use crate::models::{Note, NoteConnection};
use serde::{Deserialize, Serialize};

pub(crate) const LIST_NOTES: &str = r#"query ListNotes {
  listNotes {
    items {
      id
      clientId
      name
      description
      completed
    }
  }
}"#;

pub(crate) const CREATE_NOTE: &str = r#"mutation CreateNote($input: CreateNoteInput!) {
  createNote(input: $input) {
    id
    clientId
    name
    description
    completed
  }
}"#;

pub(crate) const UPDATE_NOTE: &str = r#"mutation UpdateNote($input: UpdateNoteInput!) {
  updateNote(input: $input) {
    id
    clientId
    name
    description
    completed
  }
}"#;

pub(crate) const DELETE_NOTE: &str = r#"mutation DeleteNote($input: DeleteNoteInput!) {
  deleteNote(input: $input) {
    id
    clientId
    name
    description
    completed
  }
}"#;

pub(crate) const ON_CREATE_NOTE: &str = r#"subscription OnCreateNote {
  onCreateNote {
    id
    clientId
    name
    description
    completed
  }
}"#;

#[derive(Serialize, Clone, Debug)]
pub(crate) struct GraphQlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

/// `{"input": ...}` variables shared by all mutations.
#[derive(Serialize, Clone, Debug)]
pub(crate) struct InputVariables<T: Serialize> {
    pub input: T,
}

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct GraphQlErrorItem {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorItem>,
}

impl<T> GraphQlResponse<T> {
    /// Any reported error fails the call, even alongside partial data.
    pub fn into_result(self) -> ApiResult<T> {
        if !self.errors.is_empty() {
            let unauthorized = self
                .errors
                .iter()
                .any(|e| e.error_type.as_deref() == Some("Unauthorized"));
            let message = self
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiError {
                kind: if unauthorized {
                    ApiErrorKind::Unauthorized
                } else {
                    ApiErrorKind::GraphQl
                },
                message,
            });
        }

        self.data.ok_or_else(|| ApiError {
            kind: ApiErrorKind::Parse,
            message: "GraphQL response has no data".to_string(),
        })
    }
}

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct ListNotesData {
    #[serde(rename = "listNotes")]
    pub list_notes: Option<NoteConnection>,
}

impl ListNotesData {
    pub fn into_notes(self) -> Vec<Note> {
        self.list_notes
            .map(|c| c.items.into_iter().flatten().collect())
            .unwrap_or_default()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct CreateNoteData {
    #[serde(rename = "createNote")]
    pub create_note: Note,
}

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct UpdateNoteData {
    #[serde(rename = "updateNote")]
    pub update_note: Note,
}

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct DeleteNoteData {
    #[serde(rename = "deleteNote")]
    pub delete_note: Note,
}

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct OnCreateNoteData {
    #[serde(rename = "onCreateNote")]
    pub on_create_note: Option<Note>,
}
