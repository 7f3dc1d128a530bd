//! Spectrum bars and time-domain polyline. Geometry and color math are kept
//! as plain functions beside the drawing calls so they can be tested off the
//! browser.

use web_sys::CanvasRenderingContext2d;

const BACKGROUND: &str = "#1a1a1a";

/// Bar width for `n` bins: wider than an even split, so the low bins that
/// carry most musical energy dominate the canvas.
pub(crate) fn bar_width(canvas_width: f64, n: usize) -> f64 {
    (canvas_width / n as f64) * 2.5
}

/// Bar height in pixels. The per-bin factor leans the display toward the
/// high end: high bins are divided by up to 1.8, low bins by 1.5.
pub(crate) fn bar_height(value: u8, i: usize, n: usize) -> f64 {
    let dynamic_factor = 1.5 + (i as f64 / n as f64) * 0.3;
    (value as f64 * 1.5) / dynamic_factor
}

/// Animated hue: 3 degrees per bin, drifting with wall-clock time.
pub(crate) fn bar_hue(i: usize, now_ms: f64) -> f64 {
    (i as f64 * 3.0 + now_ms * 0.1).rem_euclid(360.0)
}

/// Map a 0-255 time-domain sample (128 = silence) onto canvas y.
pub(crate) fn waveform_y(value: u8, canvas_height: f64) -> f64 {
    let mid = canvas_height / 2.0;
    let norm = (value as f64 - 128.0) / 128.0;
    mid - norm * mid * 0.9
}

pub fn draw_spectrum(
    ctx: &CanvasRenderingContext2d,
    frame: &[u8],
    width: f64,
    height: f64,
    now_ms: f64,
) {
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, width, height);

    let n = frame.len();
    if n == 0 {
        return;
    }
    let bar_w = bar_width(width, n);
    let mut x = 0.0;

    for (i, &value) in frame.iter().enumerate() {
        if x >= width {
            break;
        }
        let bar_h = bar_height(value, i, n);
        let hue = bar_hue(i, now_ms);

        let gradient = ctx.create_linear_gradient(x, height - bar_h, x, height);
        let _ = gradient.add_color_stop(0.0, &format!("hsl({hue:.0}, 100%, 50%)"));
        let _ = gradient.add_color_stop(
            0.5,
            &format!("hsl({:.0}, 90%, 45%)", (hue + 30.0).rem_euclid(360.0)),
        );
        let _ = gradient.add_color_stop(
            1.0,
            &format!("hsl({:.0}, 80%, 40%)", (hue + 60.0).rem_euclid(360.0)),
        );
        ctx.set_fill_style_canvas_gradient(&gradient);

        let glow = 0.3 + value as f64 / 255.0 * 0.2;
        ctx.set_shadow_color(&format!("hsla({hue:.0}, 100%, 50%, {glow:.2})"));
        ctx.set_shadow_blur(8.0 + value as f64 / 255.0 * 10.0);
        ctx.fill_rect(x, height - bar_h, bar_w, bar_h);

        x += bar_w + 2.0;
    }

    // Shadow state is scoped to this frame: cleared here, not left for the
    // next draw call to inherit.
    ctx.set_shadow_color("rgba(0, 0, 0, 0)");
    ctx.set_shadow_blur(0.0);
}

pub fn draw_waveform(ctx: &CanvasRenderingContext2d, frame: &[u8], width: f64, height: f64) {
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, width, height);

    let n = frame.len();
    if n < 2 {
        return;
    }

    ctx.set_stroke_style_str("#0cf");
    ctx.set_line_width(2.0);
    ctx.begin_path();
    let step = width / (n - 1) as f64;
    for (i, &value) in frame.iter().enumerate() {
        let x = i as f64 * step;
        let y = waveform_y(value, height);
        if i == 0 {
            ctx.move_to(x, y);
        } else {
            ctx.line_to(x, y);
        }
    }
    ctx.stroke();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_width_covers_a_widened_slice() {
        // 800px / 256 bins, widened 2.5x.
        let w = bar_width(800.0, 256);
        assert!((w - 7.8125).abs() < 1e-9);
    }

    #[test]
    fn bar_height_scales_with_magnitude() {
        assert_eq!(bar_height(0, 0, 256), 0.0);
        // Low bins divide by exactly the 1.5 gain: height == raw value.
        assert!((bar_height(255, 0, 256) - 255.0).abs() < 1e-9);
        // High bins are attenuated.
        assert!(bar_height(255, 255, 256) < 255.0);
    }

    #[test]
    fn bar_hue_stays_in_range() {
        for i in [0usize, 1, 100, 255] {
            for now in [0.0, 1.0e6, 123456.789] {
                let hue = bar_hue(i, now);
                assert!((0.0..360.0).contains(&hue), "hue {hue} out of range");
            }
        }
    }

    #[test]
    fn hue_advances_three_degrees_per_bin() {
        let a = bar_hue(10, 0.0);
        let b = bar_hue(11, 0.0);
        assert!(((b - a).rem_euclid(360.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn waveform_silence_sits_on_the_midline() {
        assert!((waveform_y(128, 400.0) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn waveform_extremes_stay_inside_the_canvas() {
        let top = waveform_y(255, 400.0);
        let bottom = waveform_y(0, 400.0);
        assert!(top > 0.0 && top < 200.0);
        assert!(bottom > 200.0 && bottom < 400.0);
    }
}
