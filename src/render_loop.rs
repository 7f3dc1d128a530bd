//! Cancellable `requestAnimationFrame` loop. At most one loop runs at a time:
//! `start` cancels any outstanding handle before scheduling, `stop` is
//! idempotent. A tick already dispatched when `stop` lands is tolerated; the
//! contract covers scheduled handles, not mid-flight execution.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Handle bookkeeping, kept separate from the browser calls so the
/// single-instance invariant is testable. `arm` hands back the handle the
/// caller must cancel before the new one is considered live.
#[derive(Default)]
pub(crate) struct AnimationSlot {
    handle: Option<i32>,
}

impl AnimationSlot {
    pub(crate) fn arm(&mut self, handle: i32) -> Option<i32> {
        self.handle.replace(handle)
    }

    pub(crate) fn disarm(&mut self) -> Option<i32> {
        self.handle.take()
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

type TickClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

thread_local! {
    static SLOT: RefCell<AnimationSlot> = RefCell::new(AnimationSlot::default());
    static CLOSURE: RefCell<Option<TickClosure>> = const { RefCell::new(None) };
}

/// Schedule `tick` on every display refresh until `stop` is called.
/// Replaces (and cancels) any loop already running.
pub fn start(mut tick: impl FnMut() + 'static) {
    stop();

    let Some(window) = web_sys::window() else {
        log::error!("No window; cannot start render loop");
        return;
    };

    let cb: TickClosure = Rc::new(RefCell::new(None));
    let cb_clone = cb.clone();

    *cb.borrow_mut() = Some(Closure::new(move || {
        tick();
        // Reschedule only while this loop is still the active one.
        if !SLOT.with(|s| s.borrow().is_armed()) {
            return;
        }
        let Some(window) = web_sys::window() else { return };
        match window.request_animation_frame(
            cb_clone.borrow().as_ref().unwrap().as_ref().unchecked_ref(),
        ) {
            Ok(handle) => {
                let stale = SLOT.with(|s| s.borrow_mut().arm(handle));
                debug_assert!(stale.is_some(), "tick fired without an armed slot");
            }
            Err(e) => log::error!("requestAnimationFrame failed: {e:?}"),
        }
    }));

    // Scope the borrow so the cell can still be moved into the slot below.
    let scheduled = {
        let slot = cb.borrow();
        window.request_animation_frame(slot.as_ref().unwrap().as_ref().unchecked_ref())
    };
    match scheduled {
        Ok(handle) => {
            SLOT.with(|s| s.borrow_mut().arm(handle));
            CLOSURE.with(|c| *c.borrow_mut() = Some(cb));
            log::info!("Render loop started");
        }
        Err(e) => log::error!("requestAnimationFrame failed: {e:?}"),
    }
}

/// Cancel the outstanding handle, if any. Idempotent.
pub fn stop() {
    let handle = SLOT.with(|s| s.borrow_mut().disarm());
    if let Some(handle) = handle {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle);
        }
        log::info!("Render loop stopped");
    }
    // The tick closure holds an Rc to its own cell; clear the inner slot too
    // so the cycle cannot keep the closure alive after the loop ends.
    if let Some(cell) = CLOSURE.with(|c| c.borrow_mut().take()) {
        cell.borrow_mut().take();
    }
}

pub fn is_running() -> bool {
    SLOT.with(|s| s.borrow().is_armed())
}

#[cfg(test)]
mod tests {
    use super::AnimationSlot;

    #[test]
    fn at_most_one_handle_outstanding() {
        let mut slot = AnimationSlot::default();
        assert_eq!(slot.arm(1), None);
        // Arming again surfaces the stale handle for cancellation; only the
        // new one stays live.
        assert_eq!(slot.arm(2), Some(1));
        assert!(slot.is_armed());
        assert_eq!(slot.disarm(), Some(2));
        assert!(!slot.is_armed());
    }

    #[test]
    fn disarm_is_idempotent() {
        let mut slot = AnimationSlot::default();
        slot.arm(7);
        assert_eq!(slot.disarm(), Some(7));
        assert_eq!(slot.disarm(), None);
        assert_eq!(slot.disarm(), None);
    }

    #[test]
    fn stopped_slot_reports_not_running() {
        let mut slot = AnimationSlot::default();
        assert!(!slot.is_armed());
        slot.arm(3);
        slot.disarm();
        assert!(!slot.is_armed());
    }
}
