use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    clx! {Card, div, "bg-card text-card-foreground flex flex-col gap-4 rounded-xl border py-6 shadow-sm"}
    clx! {CardHeader, div, "flex flex-col items-center gap-1.5 px-6"}
    clx! {CardTitle, h1, "text-2xl leading-none font-semibold"}
    clx! {CardContent, div, "flex flex-col gap-3 px-6"}
    clx! {CardList, ul, "flex flex-col divide-y"}
    clx! {CardItem, li, "flex items-center justify-between gap-4 py-3"}
}

pub use components::*;
