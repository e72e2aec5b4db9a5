use crate::models::ClientId;
use crate::pages::NotesPage;
use crate::state::{AppContext, AppState, NoteSyncController};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    let app_state = AppContext(AppState::new());
    let client_id = ClientId::generate();
    tracing::info!(client_id = client_id.as_str(), "starting notes client");

    let sync = NoteSyncController::new(app_state.clone(), client_id);
    provide_context(app_state);
    provide_context(sync.clone());

    sync.load();
    sync.subscribe();

    let sync_teardown = sync.clone();
    on_cleanup(move || sync_teardown.unsubscribe());

    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("") view=NotesPage />
            </Routes>
        </Router>
    }
}
