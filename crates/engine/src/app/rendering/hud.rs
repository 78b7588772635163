use super::font::{draw_text, text_width, GLYPH_HEIGHT};
use crate::tiles::PixelBuffer;
use crate::world::PixelRect;

const HIGHLIGHT_COLOR: [u8; 3] = [255, 215, 0];
const HIGHLIGHT_THICKNESS: i64 = 2;

const BUBBLE_FILL: [u8; 4] = [0, 0, 0, 230];
const BUBBLE_BORDER: [u8; 4] = [255, 215, 0, 255];
const BUBBLE_TEXT: [u8; 4] = [255, 255, 255, 255];
const BUBBLE_TEXT_SHADOW: [u8; 4] = [0, 0, 0, 255];
const KEY_CAP_FILL: [u8; 4] = [255, 215, 0, 255];
const KEY_CAP_TEXT: [u8; 4] = [20, 16, 8, 255];
const BUBBLE_PADDING: i64 = 4;
const BUBBLE_HEIGHT: i64 = 13;
const BUBBLE_LIFT: f32 = 24.0;
const BUBBLE_BOB_PX: f32 = 3.0;
const KEY_CAP_WIDTH: i64 = 7;

const HEART_BUBBLE_FILL: [u8; 4] = [255, 254, 245, 255];
const HEART_BUBBLE_BORDER: [u8; 4] = [139, 115, 85, 255];
const HEART_OUTLINE: [u8; 4] = [139, 0, 0, 255];
const HEART_FILL: [u8; 4] = [232, 49, 26, 255];
const HEART_SHINE: [u8; 4] = [255, 255, 255, 128];
const HEART_BUBBLE_WIDTH: i64 = 22;
const HEART_BUBBLE_HEIGHT: i64 = 20;
const HEART_BUBBLE_LIFT: f32 = 20.0;
const HEART_BOB_PX: f32 = 2.0;
const HEART_PIXEL_SCALE: i64 = 2;
const HEART_PATTERN: [[u8; 7]; 6] = [
    [0, 1, 1, 0, 1, 1, 0],
    [1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 0],
    [0, 0, 1, 1, 1, 0, 0],
    [0, 0, 0, 1, 0, 0, 0],
];

const WARM_TINT: [u8; 4] = [255, 240, 200, 8];
const VIGNETTE_MAX_ALPHA: f32 = 0.12;
const VIGNETTE_INNER: f32 = 0.3;
const VIGNETTE_OUTER: f32 = 0.7;

fn scale_alpha(color: [u8; 4], factor: f32) -> [u8; 4] {
    let alpha = (f32::from(color[3]) * factor.clamp(0.0, 1.0)).round() as u8;
    [color[0], color[1], color[2], alpha]
}

fn fill_rect(canvas: &mut PixelBuffer, x: i64, y: i64, width: i64, height: i64, color: [u8; 4]) {
    for py in y..y + height {
        for px in x..x + width {
            canvas.blend_pixel(px, py, color);
        }
    }
}

fn outline_rect(
    canvas: &mut PixelBuffer,
    (x, y, width, height): (i64, i64, i64, i64),
    thickness: i64,
    color: [u8; 4],
) {
    if width <= 0 || height <= 0 {
        return;
    }
    let thickness = thickness.min(width / 2).min(height / 2).max(1);
    fill_rect(canvas, x, y, width, thickness, color);
    fill_rect(canvas, x, y + height - thickness, width, thickness, color);
    fill_rect(canvas, x, y + thickness, thickness, height - 2 * thickness, color);
    fill_rect(
        canvas,
        x + width - thickness,
        y + thickness,
        thickness,
        height - 2 * thickness,
        color,
    );
}

/// Filled box with its corner pixels knocked out and a one pixel border.
fn rounded_box(
    canvas: &mut PixelBuffer,
    (x, y, width, height): (i64, i64, i64, i64),
    fill: [u8; 4],
    border: [u8; 4],
) {
    fill_rect(canvas, x + 1, y + 1, width - 2, height - 2, fill);
    fill_rect(canvas, x + 1, y, width - 2, 1, border);
    fill_rect(canvas, x + 1, y + height - 1, width - 2, 1, border);
    fill_rect(canvas, x, y + 1, 1, height - 2, border);
    fill_rect(canvas, x + width - 1, y + 1, 1, height - 2, border);
}

/// Downward pointing tail under a bubble, tip at `(tip_x, top + half_width)`.
fn bubble_tail(
    canvas: &mut PixelBuffer,
    tip_x: i64,
    top: i64,
    half_width: i64,
    fill: [u8; 4],
    border: [u8; 4],
) {
    for step in 0..=half_width {
        let span = half_width - step;
        let y = top + step;
        fill_rect(canvas, tip_x - span, y, span * 2 + 1, 1, fill);
        canvas.blend_pixel(tip_x - span - 1, y, border);
        canvas.blend_pixel(tip_x + span + 1, y, border);
    }
}

/// Opacity of the nearby highlight at `elapsed_ms`, pulsing in `[0.2, 0.8]`.
pub fn highlight_glow(elapsed_ms: f64) -> f32 {
    ((elapsed_ms * 0.005).sin() * 0.3 + 0.5) as f32
}

pub fn draw_highlight(canvas: &mut PixelBuffer, rect: PixelRect, elapsed_ms: f64) {
    let [r, g, b] = HIGHLIGHT_COLOR;
    let color = scale_alpha([r, g, b, 255], highlight_glow(elapsed_ms));
    let bounds = (
        rect.x.round() as i64 + 1,
        rect.y.round() as i64 + 1,
        rect.width.round() as i64 - 2,
        rect.height.round() as i64 - 2,
    );
    outline_rect(canvas, bounds, HIGHLIGHT_THICKNESS, color);
}

/// Dark bubble above `(center_x, anchor_y)` reading `[E] label`.
pub fn draw_prompt_bubble(
    canvas: &mut PixelBuffer,
    center_x: f32,
    anchor_y: f32,
    label: &str,
    elapsed_ms: f64,
) {
    let bob = (elapsed_ms * 0.004).sin() as f32 * BUBBLE_BOB_PX;
    let center_y = (anchor_y - BUBBLE_LIFT + bob).round() as i64;
    let label_width = i64::from(text_width(label));
    let gap = if label.is_empty() { 0 } else { BUBBLE_PADDING };
    let width = BUBBLE_PADDING * 2 + KEY_CAP_WIDTH + gap + label_width;
    let left = center_x.round() as i64 - width / 2;
    let top = center_y - BUBBLE_HEIGHT / 2;

    rounded_box(
        canvas,
        (left, top, width, BUBBLE_HEIGHT),
        BUBBLE_FILL,
        BUBBLE_BORDER,
    );
    bubble_tail(
        canvas,
        center_x.round() as i64,
        top + BUBBLE_HEIGHT,
        3,
        BUBBLE_FILL,
        BUBBLE_BORDER,
    );

    let text_y = top + (BUBBLE_HEIGHT - i64::from(GLYPH_HEIGHT)) / 2;
    let cap_x = left + BUBBLE_PADDING;
    fill_rect(canvas, cap_x, text_y - 1, KEY_CAP_WIDTH, 7, KEY_CAP_FILL);
    draw_text(canvas, cap_x + 2, text_y, "E", KEY_CAP_TEXT);

    let label_x = cap_x + KEY_CAP_WIDTH + gap;
    draw_text(canvas, label_x + 1, text_y + 1, label, BUBBLE_TEXT_SHADOW);
    draw_text(canvas, label_x, text_y, label, BUBBLE_TEXT);
}

/// Fade for a cue at `progress` in `[0, 1]`: in over the first 10%, out over the last 15%.
pub fn heart_fade(progress: f32) -> f32 {
    if progress < 0.1 {
        progress / 0.1
    } else if progress > 0.85 {
        (1.0 - progress) / 0.15
    } else {
        1.0
    }
    .clamp(0.0, 1.0)
}

/// Speech bubble holding a pixel heart, its tail pointing at `(center_x, head_y)`.
pub fn draw_heart_bubble(
    canvas: &mut PixelBuffer,
    center_x: f32,
    head_y: f32,
    elapsed_ms: f64,
    progress: f32,
) {
    let fade = heart_fade(progress);
    if fade <= 0.0 {
        return;
    }
    let bob = (elapsed_ms * 0.004).sin() as f32 * HEART_BOB_PX;
    let bubble_bottom = (head_y - HEART_BUBBLE_LIFT + bob).round() as i64;
    let tip_x = center_x.round() as i64;
    let left = tip_x - HEART_BUBBLE_WIDTH / 2;
    let top = bubble_bottom - HEART_BUBBLE_HEIGHT;

    rounded_box(
        canvas,
        (left, top, HEART_BUBBLE_WIDTH, HEART_BUBBLE_HEIGHT),
        scale_alpha(HEART_BUBBLE_FILL, fade),
        scale_alpha(HEART_BUBBLE_BORDER, fade),
    );
    bubble_tail(
        canvas,
        tip_x,
        bubble_bottom,
        3,
        scale_alpha(HEART_BUBBLE_FILL, fade),
        scale_alpha(HEART_BUBBLE_BORDER, fade),
    );

    let heart_width = HEART_PATTERN[0].len() as i64 * HEART_PIXEL_SCALE;
    let heart_height = HEART_PATTERN.len() as i64 * HEART_PIXEL_SCALE;
    let heart_left = tip_x - heart_width / 2;
    let heart_top = top + (HEART_BUBBLE_HEIGHT - heart_height) / 2;
    let outline = scale_alpha(HEART_OUTLINE, fade);
    let fill = scale_alpha(HEART_FILL, fade);
    for (row, cells) in HEART_PATTERN.iter().enumerate() {
        for (col, &cell) in cells.iter().enumerate() {
            if cell == 0 {
                continue;
            }
            let x = heart_left + col as i64 * HEART_PIXEL_SCALE;
            let y = heart_top + row as i64 * HEART_PIXEL_SCALE;
            let edge = row + 1 == HEART_PATTERN.len()
                || col == 0
                || col + 1 == cells.len()
                || HEART_PATTERN.get(row + 1).map_or(true, |below| below[col] == 0);
            let color = if edge { outline } else { fill };
            fill_rect(canvas, x, y, HEART_PIXEL_SCALE, HEART_PIXEL_SCALE, color);
        }
    }
    fill_rect(
        canvas,
        heart_left + HEART_PIXEL_SCALE,
        heart_top + HEART_PIXEL_SCALE,
        HEART_PIXEL_SCALE,
        HEART_PIXEL_SCALE,
        scale_alpha(HEART_SHINE, fade),
    );
}

/// Warm wash over the whole canvas, then a radial darkening toward the edges.
pub fn apply_ambient_light(canvas: &mut PixelBuffer) {
    let width = canvas.width();
    let height = canvas.height();
    if width == 0 || height == 0 {
        return;
    }
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let inner = width as f32 * VIGNETTE_INNER;
    let outer = width as f32 * VIGNETTE_OUTER;

    for y in 0..height {
        for x in 0..width {
            canvas.blend_pixel(i64::from(x), i64::from(y), WARM_TINT);
            let dx = x as f32 + 0.5 - center_x;
            let dy = y as f32 + 0.5 - center_y;
            let distance = (dx * dx + dy * dy).sqrt();
            let t = ((distance - inner) / (outer - inner)).clamp(0.0, 1.0);
            if t > 0.0 {
                let alpha = (t * VIGNETTE_MAX_ALPHA * 255.0).round() as u8;
                canvas.blend_pixel(i64::from(x), i64::from(y), [0, 0, 0, alpha]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glow_pulses_between_bounds() {
        assert!((highlight_glow(0.0) - 0.5).abs() < 1e-6);
        let peak = highlight_glow(std::f64::consts::FRAC_PI_2 / 0.005);
        assert!((peak - 0.8).abs() < 1e-5);
    }

    #[test]
    fn heart_fades_in_and_out() {
        assert!((heart_fade(0.05) - 0.5).abs() < 1e-6);
        assert_eq!(heart_fade(0.5), 1.0);
        assert!((heart_fade(0.925) - 0.5).abs() < 1e-4);
        assert_eq!(heart_fade(1.0), 0.0);
    }

    #[test]
    fn highlight_outlines_the_zone_and_leaves_the_middle() {
        let mut canvas = PixelBuffer::filled(20, 20, [0, 0, 0, 255]);
        let zone = PixelRect {
            x: 2.0,
            y: 2.0,
            width: 16.0,
            height: 16.0,
        };
        draw_highlight(&mut canvas, zone, 0.0);
        assert_ne!(canvas.pixel(3, 3), Some([0, 0, 0, 255]));
        assert_eq!(canvas.pixel(10, 10), Some([0, 0, 0, 255]));
        assert_eq!(canvas.pixel(2, 2), Some([0, 0, 0, 255]));
    }

    #[test]
    fn heart_bubble_paints_red_at_full_opacity() {
        let mut canvas = PixelBuffer::filled(40, 60, [0, 0, 0, 255]);
        draw_heart_bubble(&mut canvas, 20.0, 50.0, 0.0, 0.5);
        // Bubble spans rows 10..30; heart sits at rows 14..26, columns 13..27.
        assert_eq!(canvas.pixel(20, 18), Some(HEART_FILL));
        assert_eq!(canvas.pixel(20, 12), Some(HEART_BUBBLE_FILL));
    }

    #[test]
    fn finished_heart_draws_nothing() {
        let mut canvas = PixelBuffer::filled(40, 60, [0, 0, 0, 255]);
        let before = canvas.clone();
        draw_heart_bubble(&mut canvas, 20.0, 50.0, 0.0, 1.0);
        assert_eq!(canvas, before);
    }

    #[test]
    fn prompt_bubble_shows_key_cap() {
        let mut canvas = PixelBuffer::filled(60, 40, [40, 40, 40, 255]);
        draw_prompt_bubble(&mut canvas, 30.0, 34.0, "Book", 0.0);
        // Bubble centre row is 10; the key cap is filled gold around the "E".
        let gold = (0..60).any(|x| canvas.pixel(x, 8) == Some(KEY_CAP_FILL));
        assert!(gold);
    }

    #[test]
    fn vignette_darkens_corners_more_than_centre() {
        let mut canvas = PixelBuffer::filled(100, 60, [200, 200, 200, 255]);
        apply_ambient_light(&mut canvas);
        let centre = canvas.pixel(50, 30).expect("centre");
        let corner = canvas.pixel(0, 0).expect("corner");
        assert!(corner[0] < centre[0]);
        assert!(centre[0] >= 200);
    }
}
