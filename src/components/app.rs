use leptos::prelude::*;

use crate::components::controls::Controls;
use crate::components::transport::Transport;
use crate::components::visualizer::Visualizer;
use crate::state::AppState;

#[component]
pub fn App() -> impl IntoView {
    let state = AppState::new();
    provide_context(state);

    view! {
        <div class="app">
            <h1>"Soniscope"</h1>
            <Controls />
            <StatusLine />
            <Visualizer />
            <Transport />
        </div>
    }
}

#[component]
fn StatusLine() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <div class="status">
            {move || state.status.get().unwrap_or_default()}
        </div>
    }
}
