//! Session controller: the only place that mutates the analysis graph, the
//! render loop, or a file session. User intents are planned in `plan` and
//! executed here; collaborator callbacks arrive as `MediaEvent` messages.

pub mod plan;

use leptos::prelude::*;
use wasm_bindgen::JsCast;

use crate::audio::graph;
use crate::audio::media::{self, MediaEvent};
use crate::audio::microphone::{self, AcquireError};
use crate::canvas;
use crate::render_loop;
use crate::state::AppState;
use self::plan::{plan, Intent, Phase, Step};

const STATUS_RECORDING: &str = "Recording microphone input…";
const STATUS_PLAYING: &str = "Playing uploaded audio…";
const STATUS_PERMISSION: &str = "Microphone permission needed";
const STATUS_LOADING: &str = "Loading audio file…";
const STATUS_AUDIO_FAILED: &str = "Audio initialization failed";

/// Intents are serialized: while an async acquisition or dispose is in
/// flight, new intents are rejected rather than interleaved.
fn guard_pending(state: AppState, intent: &str) -> bool {
    if state.pending.get_untracked() {
        log::warn!("Ignoring {intent}: another transition is in flight");
        return false;
    }
    true
}

pub fn toggle_microphone(state: AppState) {
    if !guard_pending(state, "microphone toggle") {
        return;
    }
    let p = plan(state.phase.get_untracked(), Intent::ToggleMicrophone);
    execute(state, p, None);
}

pub fn load_file(state: AppState, file: web_sys::File) {
    if !guard_pending(state, "file load") {
        return;
    }
    let p = plan(state.phase.get_untracked(), Intent::LoadFile);
    execute(state, p, Some(file));
}

/// Pure UI flip; connection state untouched, next tick picks the mode up.
pub fn toggle_mode(state: AppState) {
    state.mode.update(|m| *m = m.toggled());
}

pub fn reset(state: AppState) {
    if !guard_pending(state, "reset") {
        return;
    }
    let p = plan(state.phase.get_untracked(), Intent::Reset);
    execute(state, p, None);
}

pub fn seek(percent: f64) {
    media::seek_percent(percent);
}

fn execute(state: AppState, p: plan::Plan, file: Option<web_sys::File>) {
    for &step in &p.steps {
        match step {
            Step::StopRenderLoop => {
                render_loop::stop();
                debug_assert!(!render_loop::is_running());
            }
            Step::DisconnectSource => graph::disconnect(),
            Step::ReleaseFileSession => media::release(),
            Step::ClearCanvas => canvas::clear(),
            Step::ClearTransport => state.clear_transport(),
            Step::ClearFileInput => clear_file_input(),
            Step::ClearStatus => state.status.set(None),
            Step::DisposeContext => dispose_context(state),
            Step::AcquireMicrophone => acquire_microphone(state),
            Step::BeginFileLoad => begin_file_load(state, file.as_ref()),
        }
    }
    state.phase.set(p.phase_after);
}

fn acquire_microphone(state: AppState) {
    state.pending.set(true);
    wasm_bindgen_futures::spawn_local(async move {
        match microphone::acquire().await {
            Ok(stream) => match graph::connect_microphone(stream) {
                Ok(()) => {
                    start_render(state);
                    state.phase.set(Phase::MicActive);
                    state.status.set(Some(STATUS_RECORDING.into()));
                }
                Err(e) => {
                    log::error!("{e}");
                    state.status.set(Some(STATUS_AUDIO_FAILED.into()));
                }
            },
            Err(AcquireError::PermissionDenied) => {
                log::warn!("Microphone permission denied");
                state.status.set(Some(STATUS_PERMISSION.into()));
            }
            Err(e @ AcquireError::DeviceError(_)) => {
                log::error!("{e}");
                state.status.set(Some("Microphone not available".into()));
            }
        }
        state.pending.set(false);
    });
}

fn begin_file_load(state: AppState, file: Option<&web_sys::File>) {
    let Some(file) = file else {
        log::error!("BeginFileLoad without a file");
        return;
    };
    match media::begin_load(state, file) {
        Ok(()) => state.status.set(Some(STATUS_LOADING.into())),
        Err(e) => {
            log::error!("{e}");
            state.status.set(Some("Could not load the selected file".into()));
        }
    }
}

fn dispose_context(state: AppState) {
    state.pending.set(true);
    wasm_bindgen_futures::spawn_local(async move {
        graph::dispose().await;
        state.pending.set(false);
        log::info!("Session reset complete");
    });
}

/// Media element callbacks land here. Stale epochs (a session replaced while
/// its load was still in flight) are dropped before they can touch anything.
pub fn on_media_event(state: AppState, epoch: u64, event: MediaEvent) {
    if !media::is_current(epoch) {
        log::debug!("Dropping stale media event from epoch {epoch}: {event:?}");
        return;
    }
    match event {
        MediaEvent::MetadataLoaded { duration } => state.duration.set(duration),
        MediaEvent::TimeUpdated { current } => state.current_time.set(current),
        MediaEvent::Ended => state.is_playing.set(false),
        MediaEvent::Connectable => {
            // canplay repeats after seeks; only the first one connects.
            if !media::mark_connected(epoch) {
                return;
            }
            match media::with_element(|el| graph::connect_media_element(el)) {
                Some(Ok(())) => {
                    start_render(state);
                    state.phase.set(Phase::FileActive);
                    state.status.set(Some(STATUS_PLAYING.into()));
                    media::request_play(state);
                }
                Some(Err(e)) => {
                    log::error!("{e}");
                    state.status.set(Some(STATUS_AUDIO_FAILED.into()));
                }
                None => {}
            }
        }
    }
}

/// One tick: read a frame from the analyser, paint it. Fully synchronous;
/// the buffer is reused across ticks.
fn start_render(state: AppState) {
    debug_assert!(graph::has_source());
    let mut frame = [0u8; graph::BIN_COUNT];
    render_loop::start(move || {
        let mode = state.mode.get_untracked();
        graph::read_frame(mode, &mut frame);
        canvas::render(&frame, mode);
    });
}

/// Clearing the input's value makes re-selecting the same file fire `change`
/// again after a reset.
fn clear_file_input() {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    if let Some(el) = document.get_element_by_id("file-input") {
        if let Ok(input) = el.dyn_into::<web_sys::HtmlInputElement>() {
            input.set_value("");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VisMode;

    #[test]
    fn mode_toggle_leaves_transport_and_phase_untouched() {
        let state = AppState::new();
        state.phase.set(Phase::FileActive);
        state.current_time.set(12.5);
        state.duration.set(240.0);
        state.is_playing.set(true);

        toggle_mode(state);

        assert_eq!(state.mode.get_untracked(), VisMode::Waveform);
        assert_eq!(state.phase.get_untracked(), Phase::FileActive);
        assert_eq!(state.current_time.get_untracked(), 12.5);
        assert_eq!(state.duration.get_untracked(), 240.0);
        assert!(state.is_playing.get_untracked());

        toggle_mode(state);
        assert_eq!(state.mode.get_untracked(), VisMode::Spectrum);
        assert_eq!(state.phase.get_untracked(), Phase::FileActive);
    }

    #[test]
    fn mode_toggle_works_while_pending() {
        // The flip touches no graph state, so it carries no pending guard.
        let state = AppState::new();
        state.pending.set(true);

        toggle_mode(state);
        assert_eq!(state.mode.get_untracked(), VisMode::Waveform);
    }
}
