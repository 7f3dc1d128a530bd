//! Frame-to-pixels mapping. The visualizer component registers its canvas
//! here once; the render tick and the reset path draw through it.

pub mod draw;

use std::cell::RefCell;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::state::VisMode;

thread_local! {
    static TARGET: RefCell<Option<HtmlCanvasElement>> = const { RefCell::new(None) };
}

pub fn set_target(canvas: HtmlCanvasElement) {
    TARGET.with(|t| *t.borrow_mut() = Some(canvas));
}

fn with_context(f: impl FnOnce(&CanvasRenderingContext2d, f64, f64)) {
    TARGET.with(|t| {
        let slot = t.borrow();
        let Some(canvas) = slot.as_ref() else { return };
        let ctx = match canvas.get_context("2d") {
            Ok(Some(obj)) => match obj.dyn_into::<CanvasRenderingContext2d>() {
                Ok(ctx) => ctx,
                Err(_) => return,
            },
            _ => {
                log::error!("Canvas has no 2d context");
                return;
            }
        };
        f(&ctx, canvas.width() as f64, canvas.height() as f64);
    });
}

/// Paint one frame. Must not block; called once per render tick.
pub fn render(frame: &[u8], mode: VisMode) {
    with_context(|ctx, w, h| match mode {
        VisMode::Spectrum => draw::draw_spectrum(ctx, frame, w, h, js_sys::Date::now()),
        VisMode::Waveform => draw::draw_waveform(ctx, frame, w, h),
    });
}

pub fn clear() {
    with_context(|ctx, w, h| ctx.clear_rect(0.0, 0.0, w, h));
}
