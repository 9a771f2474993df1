use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::recognition::domain::face_detection::{FaceCategory, FaceDetection};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;
const GLYPH_SCALE: i32 = 2;
const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * GLYPH_SCALE;
const LABEL_PADDING: i32 = 2;
const LABEL_HEIGHT: i32 = GLYPH_HEIGHT * GLYPH_SCALE + 2 * LABEL_PADDING;

const LABEL_BACKGROUND: Rgb<u8> = Rgb([20, 20, 20]);

struct Style {
    color: Rgb<u8>,
    thickness: i32,
}

fn style_for(category: FaceCategory) -> Style {
    match category {
        FaceCategory::Criminal => Style {
            color: Rgb([255, 0, 0]),
            thickness: 3,
        },
        FaceCategory::Known => Style {
            color: Rgb([0, 255, 0]),
            thickness: 2,
        },
        FaceCategory::Unknown => Style {
            color: Rgb([255, 191, 0]),
            thickness: 2,
        },
    }
}

/// Returns a copy of `frame` with every face boxed and labelled.
///
/// The input is never modified, so a reader holding it sees either the
/// raw frame or the finished overlay.
pub fn annotate(frame: &Frame, faces: &[FaceDetection]) -> Frame {
    let Some(mut image) = frame.to_rgb_image() else {
        return frame.clone();
    };
    for face in faces {
        let style = style_for(face.category);
        draw_box(&mut image, &face.bbox, &style);
        draw_label(&mut image, &face.bbox, &face.label, style.color);
    }
    Frame::from_rgb_image(image, frame.index(), frame.captured_at())
}

fn draw_box(image: &mut RgbImage, bbox: &BoundingBox, style: &Style) {
    for inset in 0..style.thickness {
        let w = bbox.width() - 2 * inset;
        let h = bbox.height() - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(bbox.left + inset, bbox.top + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(image, rect, style.color);
    }
}

/// Draws `text` on a dark strip just above the box, or inside its top
/// edge when the box touches the top of the frame.
fn draw_label(image: &mut RgbImage, bbox: &BoundingBox, text: &str, color: Rgb<u8>) {
    let text: String = text.chars().flat_map(|c| c.to_uppercase()).collect();
    let len = text.chars().count() as i32;
    if len == 0 {
        return;
    }
    let strip_width = len * GLYPH_ADVANCE + 2 * LABEL_PADDING;
    let strip_top = if bbox.top >= LABEL_HEIGHT {
        bbox.top - LABEL_HEIGHT
    } else {
        bbox.top.max(0)
    };
    let strip_left = bbox.left.max(0);

    draw_filled_rect_mut(
        image,
        Rect::at(strip_left, strip_top).of_size(strip_width as u32, LABEL_HEIGHT as u32),
        LABEL_BACKGROUND,
    );

    let mut x = strip_left + LABEL_PADDING;
    let y = strip_top + LABEL_PADDING;
    for ch in text.chars() {
        if let Some(rows) = glyph_bits(ch) {
            draw_glyph(image, x, y, &rows, color);
        }
        x += GLYPH_ADVANCE;
    }
}

fn draw_glyph(image: &mut RgbImage, x: i32, y: i32, rows: &[u8; 7], color: Rgb<u8>) {
    for (row, pattern) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                fill_clipped(
                    image,
                    x + col * GLYPH_SCALE,
                    y + row as i32 * GLYPH_SCALE,
                    GLYPH_SCALE,
                    color,
                );
            }
        }
    }
}

fn fill_clipped(image: &mut RgbImage, x: i32, y: i32, size: i32, color: Rgb<u8>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    for py in y.max(0)..(y + size).min(h) {
        for px in x.max(0)..(x + size).min(w) {
            image.put_pixel(px as u32, py as u32, color);
        }
    }
}

/// 5x7 bitmap font, one byte per row, most significant of the low five
/// bits is the leftmost column.
fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0, 0b00110, 0b00110, 0, 0b00110, 0b00110, 0],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '.' => [0, 0, 0, 0, 0, 0b00110, 0b00110],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(rows)
}
