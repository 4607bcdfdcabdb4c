//! Debug visualizations: match rectangles and score labels drawn onto captures
//!
//! Labels use a built-in 3x5 pixel font so no font file has to ship with the
//! harness. Only the characters the labels need are defined; anything else
//! renders as a blank cell.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

pub const MATCH_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const MISS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const LABEL_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

// Rows top to bottom, bit 2 is the leftmost column.
fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => [0; 5],
    }
}

/// Draw `text` (upper-cased) with its top-left at (x, y); `scale` is pixels per font dot.
/// Parts falling outside the image are clipped.
pub fn draw_label(image: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    let advance = ((GLYPH_WIDTH + 1) * scale) as i32;

    for (i, c) in text.to_uppercase().chars().enumerate() {
        let origin_x = x + i as i32 * advance;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let px = origin_x + (col * scale) as i32;
                let py = y + (row as u32 * scale) as i32;
                draw_filled_rect_mut(image, Rect::at(px, py).of_size(scale, scale), color);
            }
        }
    }
}

/// Height in pixels of a label drawn at `scale`
pub fn label_height(scale: u32) -> u32 {
    GLYPH_HEIGHT * scale.max(1)
}

/// The reference with a "REFERENCE TEMPLATE" label, saved once per poll
pub fn annotate_reference(reference: &RgbImage) -> RgbImage {
    let mut out = reference.clone();
    draw_label(&mut out, "Reference Template", 2, 2, 1, MISS_COLOR);
    out
}

/// A capture with the best window outlined (green when it meets the
/// threshold, red otherwise), its score above it and the threshold top-left
pub fn annotate_attempt(
    capture: &RgbImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    score: f32,
    threshold: f32,
) -> RgbImage {
    let mut out = capture.clone();
    let color = if score >= threshold {
        MATCH_COLOR
    } else {
        MISS_COLOR
    };

    // Two-pixel outline
    let outer = Rect::at(x as i32, y as i32).of_size(width.max(1), height.max(1));
    draw_hollow_rect_mut(&mut out, outer, color);
    if width > 2 && height > 2 {
        let inner = Rect::at(x as i32 + 1, y as i32 + 1).of_size(width - 2, height - 2);
        draw_hollow_rect_mut(&mut out, inner, color);
    }

    let label_y = y as i32 - label_height(2) as i32 - 4;
    draw_label(&mut out, &format!("Match: {score:.4}"), x as i32, label_y, 2, color);
    draw_label(
        &mut out,
        &format!("Threshold: {threshold:.4}"),
        10,
        10,
        2,
        LABEL_COLOR,
    );
    out
}
