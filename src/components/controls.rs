use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::session;
use crate::session::plan::Phase;
use crate::state::AppState;

#[component]
pub fn Controls() -> impl IntoView {
    let state = expect_context::<AppState>();

    let mic_label = move || match state.phase.get() {
        Phase::MicActive => "Stop microphone",
        _ => "Start microphone",
    };

    let on_mic = move |_| session::toggle_microphone(state);
    let on_mode = move |_| session::toggle_mode(state);
    let on_reset = move |_| session::reset(state);

    let on_file_change = move |ev: web_sys::Event| {
        let target = ev.target().unwrap();
        let input: web_sys::HtmlInputElement = target.unchecked_into();
        if let Some(file) = input.files().and_then(|files| files.get(0)) {
            session::load_file(state, file);
        }
    };

    // Controls stay disabled while an async transition is in flight so a
    // double-click cannot interleave two acquisitions.
    let pending = move || state.pending.get();

    view! {
        <div class="controls">
            <button class="ctl-btn" on:click=on_mic disabled=pending>
                {mic_label}
            </button>
            <input
                type="file"
                id="file-input"
                accept="audio/*"
                on:change=on_file_change
                disabled=pending
            />
            <button class="ctl-btn" on:click=on_mode disabled=pending>
                {move || state.mode.get().toggle_label()}
            </button>
            <button class="ctl-btn" on:click=on_reset disabled=pending>
                "Reset"
            </button>
        </div>
    }
}
