use leptos::prelude::*;
use web_sys::HtmlCanvasElement;

/// The 800x400 render surface. Registered once with the canvas module so the
/// render tick and the reset path can reach it without threading a handle
/// through every call.
#[component]
pub fn Visualizer() -> impl IntoView {
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    Effect::new(move || {
        let Some(canvas_el) = canvas_ref.get() else { return };
        let canvas: &HtmlCanvasElement = canvas_el.as_ref();
        crate::canvas::set_target(canvas.clone());
    });

    view! {
        <div class="visualizer">
            <canvas node_ref=canvas_ref width="800" height="400" />
        </div>
    }
}
