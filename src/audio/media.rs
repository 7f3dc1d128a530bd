//! File playback sessions: a media element bound to an object URL, with its
//! readiness events funneled into the session controller as messages.
//!
//! Each load opens a new *epoch*; events from a replaced session carry a
//! stale epoch and are dropped, so a slow `LoadFile(A)` can never connect
//! after `LoadFile(B)` has taken over. The object URL lives in the session
//! slot and is revoked exactly once, when the slot is taken.

use std::cell::RefCell;
use std::fmt;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AddEventListenerOptions, File, HtmlAudioElement, Url};

use crate::audio::graph;
use crate::session;
use crate::state::AppState;

pub struct MediaError(pub String);

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media error: {}", self.0)
    }
}

/// Media element callbacks, re-expressed as messages for the controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MediaEvent {
    /// `loadedmetadata`: duration is now known (transport readiness, not
    /// connection readiness).
    MetadataLoaded { duration: f64 },
    /// `timeupdate`.
    TimeUpdated { current: f64 },
    /// `canplay`: the element can be connected into the graph.
    Connectable,
    /// Playback ran off the end of the file.
    Ended,
}

/// Pure bookkeeping for load generations. One live epoch at most; connection
/// is recorded once per epoch (`canplay` can fire again after seeks).
#[derive(Default)]
pub(crate) struct EpochLedger {
    next: u64,
    live: Option<(u64, bool)>,
}

impl EpochLedger {
    pub(crate) fn open(&mut self) -> u64 {
        self.next += 1;
        self.live = Some((self.next, false));
        self.next
    }

    pub(crate) fn close(&mut self) -> Option<u64> {
        self.live.take().map(|(epoch, _)| epoch)
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        matches!(self.live, Some((live, _)) if live == epoch)
    }

    /// True only the first time the current epoch reports connectable.
    pub(crate) fn mark_connected(&mut self, epoch: u64) -> bool {
        match &mut self.live {
            Some((live, connected)) if *live == epoch && !*connected => {
                *connected = true;
                true
            }
            _ => false,
        }
    }
}

struct FileSession {
    element: HtmlAudioElement,
    object_url: Option<String>,
    epoch: u64,
    listeners: Vec<(&'static str, Closure<dyn FnMut()>)>,
}

thread_local! {
    static SESSION: RefCell<Option<FileSession>> = const { RefCell::new(None) };
    static LEDGER: RefCell<EpochLedger> = RefCell::new(EpochLedger::default());
}

fn listen(
    element: &HtmlAudioElement,
    name: &'static str,
    cb: Closure<dyn FnMut()>,
    listeners: &mut Vec<(&'static str, Closure<dyn FnMut()>)>,
) -> Result<(), MediaError> {
    element
        .add_event_listener_with_callback(name, cb.as_ref().unchecked_ref())
        .map_err(|e| MediaError(format!("listener {name} failed: {e:?}")))?;
    listeners.push((name, cb));
    Ok(())
}

/// Build a new session for the selected file. The element is not connected
/// here; connection waits for its `canplay` message.
pub fn begin_load(state: AppState, file: &File) -> Result<(), MediaError> {
    let element = HtmlAudioElement::new()
        .map_err(|e| MediaError(format!("audio element failed: {e:?}")))?;
    let url = Url::create_object_url_with_blob(file)
        .map_err(|e| MediaError(format!("object URL failed: {e:?}")))?;
    element.set_src(&url);

    let epoch = LEDGER.with(|l| l.borrow_mut().open());
    let mut listeners = Vec::with_capacity(4);

    let el = element.clone();
    listen(
        &element,
        "loadedmetadata",
        Closure::new(move || {
            session::on_media_event(
                state,
                epoch,
                MediaEvent::MetadataLoaded { duration: el.duration() },
            );
        }),
        &mut listeners,
    )?;

    let el = element.clone();
    listen(
        &element,
        "timeupdate",
        Closure::new(move || {
            session::on_media_event(
                state,
                epoch,
                MediaEvent::TimeUpdated { current: el.current_time() },
            );
        }),
        &mut listeners,
    )?;

    listen(
        &element,
        "canplay",
        Closure::new(move || {
            session::on_media_event(state, epoch, MediaEvent::Connectable);
        }),
        &mut listeners,
    )?;

    listen(
        &element,
        "ended",
        Closure::new(move || {
            session::on_media_event(state, epoch, MediaEvent::Ended);
        }),
        &mut listeners,
    )?;

    log::info!("Loading \"{}\" (epoch {epoch})", file.name());
    SESSION.with(|s| {
        *s.borrow_mut() = Some(FileSession {
            element,
            object_url: Some(url),
            epoch,
            listeners,
        })
    });
    Ok(())
}

/// Pause, drop listeners, revoke the object URL. Idempotent; taking the slot
/// guarantees the URL is revoked at most once.
pub fn release() {
    let Some(mut s) = SESSION.with(|slot| slot.borrow_mut().take()) else {
        return;
    };
    LEDGER.with(|l| l.borrow_mut().close());
    s.element.pause().ok();
    for (name, cb) in &s.listeners {
        let _ = s
            .element
            .remove_event_listener_with_callback(name, cb.as_ref().unchecked_ref());
    }
    if let Some(url) = s.object_url.take() {
        let _ = Url::revoke_object_url(&url);
    }
    log::info!("File session released (epoch {})", s.epoch);
}

pub fn is_current(epoch: u64) -> bool {
    LEDGER.with(|l| l.borrow().is_current(epoch))
}

/// Records the first `canplay` of the current epoch; repeats (e.g. after a
/// seek) return false so the element is never connected twice.
pub fn mark_connected(epoch: u64) -> bool {
    LEDGER.with(|l| l.borrow_mut().mark_connected(epoch))
}

pub fn with_element<R>(f: impl FnOnce(&HtmlAudioElement) -> R) -> Option<R> {
    SESSION.with(|s| s.borrow().as_ref().map(|session| f(&session.element)))
}

/// Request playback. A rejected play promise is the recoverable autoplay
/// block: the session stays connected and visualized, and playback retries on
/// the next click anywhere in the page.
pub fn request_play(state: AppState) {
    let Some(play_result) = with_element(|el| el.play()) else {
        return;
    };
    match play_result {
        Ok(promise) => {
            wasm_bindgen_futures::spawn_local(async move {
                match JsFuture::from(promise).await {
                    Ok(_) => state.is_playing.set(true),
                    Err(_) => {
                        log::warn!("Autoplay blocked, waiting for a user gesture");
                        state
                            .status
                            .set(Some("Click anywhere to start playback".into()));
                        install_gesture_retry(state);
                    }
                }
            });
        }
        Err(e) => log::error!("play() call failed: {e:?}"),
    }
}

fn install_gesture_retry(state: AppState) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let cb = Closure::once_into_js(move || {
        graph::resume_if_suspended();
        let Some(Ok(promise)) = with_element(|el| el.play()) else {
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            if JsFuture::from(promise).await.is_ok() {
                state.is_playing.set(true);
                state.status.set(Some("Playing uploaded audio…".into()));
            }
        });
    });
    let opts = AddEventListenerOptions::new();
    opts.set_once(true);
    if let Err(e) = document.add_event_listener_with_callback_and_add_event_listener_options(
        "click",
        cb.unchecked_ref(),
        &opts,
    ) {
        log::error!("Gesture listener failed: {e:?}");
    }
}

/// Map a slider position to a seek target. None until duration is known.
pub(crate) fn seek_target(percent: f64, duration: f64) -> Option<f64> {
    if duration.is_finite() && duration > 0.0 {
        Some(percent.clamp(0.0, 100.0) / 100.0 * duration)
    } else {
        None
    }
}

pub fn seek_percent(percent: f64) {
    let _ = with_element(|el| {
        if let Some(target) = seek_target(percent, el.duration()) {
            el.set_current_time(target);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epochs_are_monotonic_and_exclusive() {
        let mut ledger = EpochLedger::default();
        let a = ledger.open();
        let b = ledger.open();
        assert!(b > a);
        assert!(!ledger.is_current(a), "replaced epoch must be stale");
        assert!(ledger.is_current(b));
    }

    #[test]
    fn stale_epoch_never_connects() {
        // LoadFile(A) then LoadFile(B) before A's canplay: B wins, A's
        // late events are dropped.
        let mut ledger = EpochLedger::default();
        let a = ledger.open();
        let b = ledger.open();
        assert!(!ledger.mark_connected(a));
        assert!(ledger.mark_connected(b));
    }

    #[test]
    fn connection_is_recorded_once_per_epoch() {
        let mut ledger = EpochLedger::default();
        let e = ledger.open();
        assert!(ledger.mark_connected(e));
        assert!(!ledger.mark_connected(e), "repeat canplay must not reconnect");
    }

    #[test]
    fn closed_ledger_rejects_everything() {
        let mut ledger = EpochLedger::default();
        let e = ledger.open();
        assert_eq!(ledger.close(), Some(e));
        assert_eq!(ledger.close(), None, "close is idempotent");
        assert!(!ledger.is_current(e));
        assert!(!ledger.mark_connected(e));
    }

    #[test]
    fn seek_needs_known_duration() {
        assert_eq!(seek_target(50.0, f64::NAN), None);
        assert_eq!(seek_target(50.0, f64::INFINITY), None);
        assert_eq!(seek_target(50.0, 0.0), None);
    }

    #[test]
    fn seek_maps_percent_onto_timeline() {
        assert_eq!(seek_target(50.0, 120.0), Some(60.0));
        assert_eq!(seek_target(0.0, 120.0), Some(0.0));
        assert_eq!(seek_target(100.0, 120.0), Some(120.0));
        assert_eq!(seek_target(250.0, 120.0), Some(120.0));
    }
}
