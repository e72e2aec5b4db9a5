use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent, CardHeader,
    CardItem, CardList, CardTitle, Input, Spinner,
};
use crate::models::{DraftField, Note};
use crate::state::{AppContext, NoteSyncController};
use icons::{Check, Plus, X};
use leptos::prelude::*;
use std::str::FromStr;

#[component]
pub fn NotesPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let sync = expect_context::<NoteSyncController>();
    let notes = app_state.0.notes;

    let name = Signal::derive(move || notes.with(|s| s.form.name.clone()));
    let description = Signal::derive(move || notes.with(|s| s.form.description.clone()));

    let sync_input = sync.clone();
    let on_change = Callback::new(move |(field, value): (String, String)| {
        match DraftField::from_str(&field) {
            Ok(field) => sync_input.set_draft_field(field, value),
            Err(_) => tracing::debug!(field, "ignoring input for unknown draft field"),
        }
    });

    let sync_create = sync.clone();
    let on_create = move |_| {
        // Validation errors are already surfaced as a browser alert.
        let _ = sync_create.create_note();
    };

    let sync_status = sync.clone();
    let sync_error = sync.clone();
    let last_error = Signal::derive(move || sync_error.last_backend_error().unwrap_or_default());

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto w-full max-w-xl px-4 py-8">
                <Card>
                    <CardHeader>
                        <CardTitle>"Notes App"</CardTitle>
                    </CardHeader>

                    <CardContent>
                        <Input
                            name=DraftField::Name.as_ref()
                            placeholder="Note Name"
                            value=name
                            on_change=on_change
                        />
                        <Input
                            name=DraftField::Description.as_ref()
                            placeholder="Note description"
                            value=description
                            on_change=on_change
                        />
                        <Button class="w-full" on:click=on_create>
                            <Plus />
                            "Add Note"
                        </Button>

                        <div class="text-center text-sm font-medium">
                            {move || notes.with(|s| {
                                format!("{} Completed / {} Total", s.completed_count(), s.total_count())
                            })}
                        </div>

                        <Show when=move || !sync_status.is_backend_online() fallback=|| ().into_view()>
                            <div
                                class="text-center text-xs text-muted-foreground"
                                title=last_error
                            >
                                "Backend unreachable, changes may not be saved."
                            </div>
                        </Show>

                        <Show when=move || notes.with(|s| s.error) fallback=|| ().into_view()>
                            <Alert class="border-destructive/30">
                                <AlertDescription class="text-destructive">
                                    "Could not load notes."
                                </AlertDescription>
                            </Alert>
                        </Show>

                        <Show
                            when=move || !notes.with(|s| s.loading)
                            fallback=|| view! {
                                <div class="flex justify-center py-4">
                                    <Spinner />
                                </div>
                            }
                        >
                            <NoteList />
                        </Show>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

#[component]
fn NoteList() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let notes = app_state.0.notes;

    view! {
        <CardList>
            <For
                each=move || notes.with(|s| s.notes.clone())
                key=|note| (note.id.clone(), note.completed)
                children=move |note: Note| view! { <NoteRow note=note /> }
            />
        </CardList>
    }
}

#[component]
fn NoteRow(note: Note) -> impl IntoView {
    let sync = expect_context::<NoteSyncController>();

    let sync_toggle = sync.clone();
    let note_for_toggle = note.clone();
    let on_toggle = move |_| sync_toggle.toggle_complete(&note_for_toggle);

    let id_for_delete = note.id.clone();
    let on_delete = move |_| sync.delete_note(&id_for_delete);

    let completed = note.completed;

    view! {
        <CardItem>
            <div class="min-w-0 text-left">
                <div class="truncate text-sm font-medium">{note.name}</div>
                <div class="truncate text-xs text-muted-foreground">{note.description}</div>
            </div>
            <div class="flex shrink-0 items-center gap-2">
                {if completed {
                    view! {
                        <Button
                            variant=ButtonVariant::Success
                            size=ButtonSize::Icon
                            attr:title="Mark as not done"
                            on:click=on_toggle
                        >
                            <Check />
                        </Button>
                    }
                    .into_any()
                } else {
                    view! {
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Icon
                            attr:title="Mark as done"
                            on:click=on_toggle
                        >
                            <X />
                        </Button>
                    }
                    .into_any()
                }}
                <Button variant=ButtonVariant::Destructive size=ButtonSize::Sm on:click=on_delete>
                    "Delete"
                </Button>
            </div>
        </CardItem>
    }
}
