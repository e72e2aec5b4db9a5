use leptos::prelude::*;
use tw_merge::tw_merge;
use wasm_bindgen::JsCast;

/// Controlled text input. The value lives in the caller's state; every
/// keystroke is reported as `(name, value)` through `on_change`.
#[component]
pub fn Input(
    #[prop(into, optional)] class: String,
    #[prop(into)] name: String,
    #[prop(into, optional)] placeholder: String,
    #[prop(into)] value: Signal<String>,
    #[prop(into)] on_change: Callback<(String, String)>,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "placeholder:text-muted-foreground selection:bg-primary selection:text-primary-foreground border-input flex h-9 w-full min-w-0 rounded-md border bg-transparent px-3 py-1 text-base shadow-xs transition-[color,box-shadow] outline-none md:text-sm",
        "focus-visible:border-ring focus-visible:ring-ring/50 focus-visible:ring-2",
        class
    );

    let on_input = move |ev: web_sys::Event| {
        if let Some(input) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        {
            on_change.run((input.name(), input.value()));
        }
    };

    view! {
        <input
            data-name="Input"
            type="text"
            class=merged_class
            name=name
            placeholder=placeholder
            prop:value=move || value.get()
            on:input=on_input
        />
    }
}
