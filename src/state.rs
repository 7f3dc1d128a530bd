use leptos::prelude::*;

use crate::session::plan::Phase;

/// Which extraction function the render tick calls. Global toggle,
/// independent of the connected source; the graph topology never changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VisMode {
    #[default]
    Spectrum,
    Waveform,
}

impl VisMode {
    pub fn toggled(self) -> Self {
        match self {
            VisMode::Spectrum => VisMode::Waveform,
            VisMode::Waveform => VisMode::Spectrum,
        }
    }

    /// Button label: names the mode the toggle would switch to.
    pub fn toggle_label(self) -> &'static str {
        match self {
            VisMode::Spectrum => "Waveform mode",
            VisMode::Waveform => "Spectrum mode",
        }
    }
}

#[derive(Clone, Copy)]
pub struct AppState {
    pub phase: RwSignal<Phase>,
    pub mode: RwSignal<VisMode>,
    pub status: RwSignal<Option<String>>,
    /// Transport; only meaningful while a file session exists.
    /// `duration` is NaN until the media element reports metadata.
    pub current_time: RwSignal<f64>,
    pub duration: RwSignal<f64>,
    pub is_playing: RwSignal<bool>,
    /// True while an async transition (mic acquisition, context dispose) is
    /// in flight. Intents arriving in that window are rejected and the
    /// triggering controls render disabled.
    pub pending: RwSignal<bool>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            phase: RwSignal::new(Phase::Idle),
            mode: RwSignal::new(VisMode::Spectrum),
            status: RwSignal::new(None),
            current_time: RwSignal::new(0.0),
            duration: RwSignal::new(f64::NAN),
            is_playing: RwSignal::new(false),
            pending: RwSignal::new(false),
        }
    }

    pub fn clear_transport(&self) {
        self.current_time.set(0.0);
        self.duration.set(f64::NAN);
        self.is_playing.set(false);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Slider position in percent for the transport bar; 0 until duration is known.
pub fn progress_percent(current: f64, duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        (current / duration * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}
