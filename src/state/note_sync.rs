use crate::api::realtime::NoteSubscription;
use crate::api::{ApiError, ApiErrorKind, ApiResult};
use crate::models::{ClientId, DeleteNoteInput, DraftError, DraftField, Note, UpdateNoteInput};
use crate::state::{
    note_from_form, reduce, sort_by_name, with_completion_toggled, without_note, Action,
    AppContext, NotesState,
};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// Keeps the local note list in step with the GraphQL backend.
///
/// Local edits are applied optimistically and then sent to the backend.
/// A failed write is logged and recorded in `last_backend_error`; the local
/// state is not rolled back and nothing is retried, so local and remote can
/// diverge until the next full load.
///
/// Peer-created notes arrive through the `onCreateNote` subscription. Notes
/// stamped with our own client id are echoes of our writes and are dropped.
#[derive(Clone)]
pub(crate) struct NoteSyncController {
    app_state: AppContext,
    client_id: ClientId,

    /// Connectivity state to backend API.
    backend_online: RwSignal<bool>,
    last_backend_error: RwSignal<Option<String>>,

    subscription: StoredValue<Option<NoteSubscription>, LocalStorage>,
}

impl NoteSyncController {
    pub fn new(app_state: AppContext, client_id: ClientId) -> Self {
        Self {
            app_state,
            client_id,
            backend_online: RwSignal::new(true),
            last_backend_error: RwSignal::new(None),
            subscription: StoredValue::new_local(None),
        }
    }

    pub fn is_backend_online(&self) -> bool {
        self.backend_online.get()
    }

    pub fn last_backend_error(&self) -> Option<String> {
        self.last_backend_error.get()
    }

    pub(crate) fn mark_backend_online(&self) {
        self.backend_online.set(true);
        self.last_backend_error.set(None);
    }

    pub(crate) fn mark_backend_failed(&self, e: &ApiError) {
        if e.kind == ApiErrorKind::Network {
            self.backend_online.set(false);
        }
        self.last_backend_error.set(Some(e.to_string()));
    }

    fn record<T>(&self, op: &str, result: &ApiResult<T>) {
        match result {
            Ok(_) => {
                tracing::info!(op, "backend write confirmed");
                self.mark_backend_online();
            }
            Err(e) => {
                tracing::error!(op, kind = ?e.kind, error = %e, "backend write failed");
                self.mark_backend_failed(e);
            }
        }
    }

    /// Fetches every note, sorted by name. A failure sets the error flag; no retry.
    pub fn load(&self) {
        let notes = self.app_state.0.notes;
        let api_client = self.app_state.0.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            let result = api_client.list_notes().await;
            if let Err(e) = &result {
                tracing::error!(kind = ?e.kind, error = %e, "failed to load notes");
                s2.mark_backend_failed(e);
            } else {
                s2.mark_backend_online();
            }
            notes.update(|state| apply_loaded(state, result));
        });
    }

    /// Opens the `onCreateNote` stream. Replaces any previous subscription.
    pub fn subscribe(&self) {
        let notes = self.app_state.0.notes;
        let client_id = self.client_id.clone();
        let config = self.app_state.0.api_client.get_untracked().config;

        let opened = NoteSubscription::open(&config, move |note| {
            notes.update(|state| {
                apply_remote_created(state, note, &client_id);
            });
        });

        match opened {
            Ok(sub) => {
                tracing::info!(url = %config.realtime_url, "subscribed to note creations");
                self.subscription.set_value(Some(sub));
            }
            Err(e) => tracing::error!(error = %e, "failed to open note subscription"),
        }
    }

    /// Tears down the subscription. Safe to call more than once.
    pub fn unsubscribe(&self) {
        self.subscription.update_value(|sub| {
            if let Some(mut sub) = sub.take() {
                sub.unsubscribe();
            }
        });
    }

    /// Validates the draft, shows it at the head of the list, clears the form,
    /// then persists it.
    pub fn create_note(&self) -> Result<(), DraftError> {
        let client_id = &self.client_id;
        let created = self
            .app_state
            .0
            .notes
            .try_update(|state| apply_create(state, client_id))
            .unwrap_or(Err(DraftError::MissingField));

        let note = match created {
            Ok(note) => note,
            Err(e) => {
                if let Some(w) = web_sys::window() {
                    let _ = w.alert_with_message(&e.to_string());
                }
                return Err(e);
            }
        };

        let api_client = self.app_state.0.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            let result = api_client.create_note(&note).await;
            s2.record("createNote", &result);
        });
        Ok(())
    }

    pub fn delete_note(&self, id: &str) {
        let removed = self
            .app_state
            .0
            .notes
            .try_update(|state| apply_delete(state, id))
            .flatten();

        let Some(input) = removed else {
            tracing::debug!(id, "delete ignored, note not in list");
            return;
        };

        let api_client = self.app_state.0.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            let result = api_client.delete_note(&input).await;
            s2.record("deleteNote", &result);
        });
    }

    pub fn toggle_complete(&self, note: &Note) {
        let toggled = self
            .app_state
            .0
            .notes
            .try_update(|state| apply_toggle(state, &note.id))
            .flatten();

        let Some(input) = toggled else {
            tracing::debug!(id = %note.id, "toggle ignored, note not in list");
            return;
        };

        let api_client = self.app_state.0.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            let result = api_client.update_note(&input).await;
            s2.record("updateNote", &result);
        });
    }

    pub fn set_draft_field(&self, field: DraftField, value: String) {
        self.app_state
            .0
            .notes
            .update(|state| reduce(state, Action::SetInput { field, value }));
    }
}

pub(crate) fn apply_loaded(state: &mut NotesState, result: ApiResult<Vec<Note>>) {
    match result {
        Ok(notes) => reduce(state, Action::SetNotes(sort_by_name(notes))),
        Err(_) => reduce(state, Action::LoadFailed),
    }
}

/// Returns whether the note was merged.
pub(crate) fn apply_remote_created(
    state: &mut NotesState,
    note: Note,
    client_id: &ClientId,
) -> bool {
    if client_id.owns(&note) {
        return false;
    }
    let before = state.notes.len();
    reduce(state, Action::AddNote(note));
    state.notes.len() != before
}

pub(crate) fn apply_create(
    state: &mut NotesState,
    client_id: &ClientId,
) -> Result<Note, DraftError> {
    let note = note_from_form(&state.form, client_id)?;
    reduce(state, Action::AddNote(note.clone()));
    reduce(state, Action::ResetForm);
    Ok(note)
}

pub(crate) fn apply_delete(state: &mut NotesState, id: &str) -> Option<DeleteNoteInput> {
    let notes = without_note(&state.notes, id)?;
    reduce(state, Action::SetNotes(notes));
    Some(DeleteNoteInput { id: id.to_string() })
}

pub(crate) fn apply_toggle(state: &mut NotesState, id: &str) -> Option<UpdateNoteInput> {
    let (notes, input) = with_completion_toggled(&state.notes, id)?;
    reduce(state, Action::SetNotes(notes));
    Some(input)
}
