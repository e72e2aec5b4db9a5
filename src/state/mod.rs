pub(crate) mod note_sync;

use crate::api::ApiClient;
use crate::models::{ClientId, DraftError, DraftField, Note, NoteForm, UpdateNoteInput};
use leptos::prelude::*;

pub(crate) use note_sync::NoteSyncController;

/// View state owned by the note list page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NotesState {
    pub notes: Vec<Note>,
    pub loading: bool,
    pub error: bool,
    pub form: NoteForm,
}

impl NotesState {
    pub fn new() -> Self {
        Self {
            notes: vec![],
            loading: true,
            error: false,
            form: NoteForm::default(),
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }

    pub fn completed_count(&self) -> usize {
        self.notes.iter().filter(|n| n.completed).count()
    }

    pub fn total_count(&self) -> usize {
        self.notes.len()
    }
}

impl Default for NotesState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Action {
    /// Replace the whole list (initial load, local splice/toggle).
    SetNotes(Vec<Note>),
    /// Prepend a note. Ids already in the list are ignored.
    AddNote(Note),
    ResetForm,
    SetInput { field: DraftField, value: String },
    LoadFailed,
}

pub(crate) fn reduce(state: &mut NotesState, action: Action) {
    match action {
        Action::SetNotes(notes) => {
            state.notes = notes;
            state.loading = false;
        }
        Action::AddNote(note) => {
            if state.position(&note.id).is_none() {
                state.notes.insert(0, note);
            }
        }
        Action::ResetForm => {
            state.form = NoteForm::default();
        }
        Action::SetInput { field, value } => match field {
            DraftField::Name => state.form.name = value,
            DraftField::Description => state.form.description = value,
        },
        Action::LoadFailed => {
            state.loading = false;
            state.error = true;
        }
    }
}

/// Case-insensitive name order, lower case first on case-only ties, the way
/// a browser `localeCompare` orders plain names. The sort is stable.
pub(crate) fn sort_by_name(mut notes: Vec<Note>) -> Vec<Note> {
    notes.sort_by(|a, b| compare_names(&a.name, &b.name));
    notes
}

fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Builds a fresh note from the draft, or rejects an incomplete draft.
pub(crate) fn note_from_form(form: &NoteForm, client_id: &ClientId) -> Result<Note, DraftError> {
    if form.name.is_empty() || form.description.is_empty() {
        return Err(DraftError::MissingField);
    }

    Ok(Note {
        id: uuid::Uuid::new_v4().to_string(),
        name: form.name.clone(),
        description: form.description.clone(),
        completed: false,
        client_id: Some(client_id.as_str().to_string()),
    })
}

/// The list with the note `id` spliced out, or `None` if it is not present.
pub(crate) fn without_note(notes: &[Note], id: &str) -> Option<Vec<Note>> {
    let index = notes.iter().position(|n| n.id == id)?;
    let mut out = Vec::with_capacity(notes.len().saturating_sub(1));
    out.extend_from_slice(&notes[..index]);
    out.extend_from_slice(&notes[index + 1..]);
    Some(out)
}

/// The list with `completed` flipped on note `id`, plus the mutation input
/// carrying the new value.
pub(crate) fn with_completion_toggled(
    notes: &[Note],
    id: &str,
) -> Option<(Vec<Note>, UpdateNoteInput)> {
    let index = notes.iter().position(|n| n.id == id)?;
    let mut out = notes.to_vec();
    out[index].completed = !out[index].completed;
    let input = UpdateNoteInput {
        id: id.to_string(),
        completed: out[index].completed,
    };
    Some((out, input))
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,
    pub notes: RwSignal<NotesState>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_client(ApiClient::from_env())
    }

    pub fn with_client(api_client: ApiClient) -> Self {
        Self {
            api_client: RwSignal::new(api_client),
            notes: RwSignal::new(NotesState::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
