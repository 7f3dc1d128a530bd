use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::session;
use crate::state::{progress_percent, AppState};

/// Glyph for the play-state indicator next to the progress bar.
pub fn play_glyph(is_playing: bool) -> &'static str {
    if is_playing {
        "\u{25b6}"
    } else {
        "\u{275a}\u{275a}"
    }
}

/// `m:ss` display; NaN (duration before metadata) renders as 0:00.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".into();
    }
    let total = seconds as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[component]
pub fn Transport() -> impl IntoView {
    let state = expect_context::<AppState>();

    let percent = move || {
        progress_percent(state.current_time.get(), state.duration.get())
    };

    let on_seek = move |ev: web_sys::Event| {
        let target = ev.target().unwrap();
        let input: web_sys::HtmlInputElement = target.unchecked_into();
        if let Ok(value) = input.value().parse::<f64>() {
            session::seek(value);
        }
    };

    view! {
        <div class="transport">
            <span class="play-indicator">{move || play_glyph(state.is_playing.get())}</span>
            <span class="time">{move || format_time(state.current_time.get())}</span>
            <input
                type="range"
                min="0"
                max="100"
                step="0.1"
                prop:value=move || percent().to_string()
                on:input=on_seek
            />
            <span class="time">{move || format_time(state.duration.get())}</span>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_minutes() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(60.0), "1:00");
        assert_eq!(format_time(600.0), "10:00");
    }

    #[test]
    fn seconds_are_zero_padded_and_floored() {
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(119.99), "1:59");
    }

    #[test]
    fn play_glyph_tracks_playback() {
        assert_eq!(play_glyph(true), "\u{25b6}");
        assert_eq!(play_glyph(false), "\u{275a}\u{275a}");
    }

    #[test]
    fn unknown_duration_renders_as_zero() {
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(-1.0), "0:00");
    }
}
