use super::frame::{Color, Frame};

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const FIRST_GLYPH: u32 = ' ' as u32;

/// Horizontal anchor for a line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Pixel advance of one glyph cell at `scale`.
pub fn glyph_advance(scale: i32) -> i32 {
    (GLYPH_WIDTH + 1) * scale
}

pub fn line_height(scale: i32) -> i32 {
    (GLYPH_HEIGHT + 2) * scale
}

pub fn text_width(text: &str, scale: i32) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        return 0;
    }
    count * glyph_advance(scale) - scale
}

/// Draws `text` with its anchor at `x` and its top edge at `y`.
///
/// Characters outside printable ASCII draw as blanks; everything is clipped
/// to the frame.
pub fn draw_text(
    frame: &mut Frame,
    x: i32,
    y: i32,
    scale: i32,
    align: Align,
    text: &str,
    color: Color,
) {
    let scale = scale.max(1);
    let width = text_width(text, scale);
    let mut pen_x = match align {
        Align::Left => x,
        Align::Center => x - width / 2,
        Align::Right => x - width,
    };
    for ch in text.chars() {
        if let Some(rows) = glyph_rows(ch) {
            draw_glyph(frame, pen_x, y, scale, rows, color);
        }
        pen_x += glyph_advance(scale);
    }
}

fn draw_glyph(frame: &mut Frame, x: i32, y: i32, scale: i32, rows: &[u8; 5], color: Color) {
    for (row_index, row_bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if row_bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            frame.fill_rect(
                x + col * scale,
                y + row_index as i32 * scale,
                scale,
                scale,
                color,
            );
        }
    }
}

fn glyph_rows(ch: char) -> Option<&'static [u8; 5]> {
    let code = ch as u32;
    let index = code.checked_sub(FIRST_GLYPH)? as usize;
    GLYPHS.get(index)
}

/// 3x5 bitmap glyphs for `' '..='~'`, three bits per row, MSB on the left.
const GLYPHS: [[u8; 5]; 95] = [
    [0b000, 0b000, 0b000, 0b000, 0b000], // space
    [0b010, 0b010, 0b010, 0b000, 0b010], // !
    [0b101, 0b101, 0b000, 0b000, 0b000], // "
    [0b101, 0b111, 0b101, 0b111, 0b101], // #
    [0b111, 0b110, 0b111, 0b011, 0b111], // $
    [0b101, 0b001, 0b010, 0b100, 0b101], // %
    [0b010, 0b101, 0b010, 0b101, 0b011], // &
    [0b010, 0b010, 0b000, 0b000, 0b000], // '
    [0b001, 0b010, 0b010, 0b010, 0b001], // (
    [0b100, 0b010, 0b010, 0b010, 0b100], // )
    [0b000, 0b101, 0b010, 0b101, 0b000], // *
    [0b000, 0b010, 0b111, 0b010, 0b000], // +
    [0b000, 0b000, 0b000, 0b010, 0b100], // ,
    [0b000, 0b000, 0b111, 0b000, 0b000], // -
    [0b000, 0b000, 0b000, 0b000, 0b010], // .
    [0b001, 0b001, 0b010, 0b100, 0b100], // /
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
    [0b000, 0b010, 0b000, 0b010, 0b000], // :
    [0b000, 0b010, 0b000, 0b010, 0b100], // ;
    [0b001, 0b010, 0b100, 0b010, 0b001], // <
    [0b000, 0b111, 0b000, 0b111, 0b000], // =
    [0b100, 0b010, 0b001, 0b010, 0b100], // >
    [0b111, 0b001, 0b011, 0b000, 0b010], // ?
    [0b111, 0b101, 0b111, 0b100, 0b111], // @
    [0b010, 0b101, 0b111, 0b101, 0b101], // A
    [0b110, 0b101, 0b110, 0b101, 0b110], // B
    [0b111, 0b100, 0b100, 0b100, 0b111], // C
    [0b110, 0b101, 0b101, 0b101, 0b110], // D
    [0b111, 0b100, 0b110, 0b100, 0b111], // E
    [0b111, 0b100, 0b110, 0b100, 0b100], // F
    [0b111, 0b100, 0b101, 0b101, 0b111], // G
    [0b101, 0b101, 0b111, 0b101, 0b101], // H
    [0b111, 0b010, 0b010, 0b010, 0b111], // I
    [0b111, 0b001, 0b001, 0b101, 0b111], // J
    [0b101, 0b101, 0b110, 0b101, 0b101], // K
    [0b100, 0b100, 0b100, 0b100, 0b111], // L
    [0b101, 0b111, 0b111, 0b101, 0b101], // M
    [0b101, 0b111, 0b111, 0b111, 0b101], // N
    [0b111, 0b101, 0b101, 0b101, 0b111], // O
    [0b110, 0b101, 0b110, 0b100, 0b100], // P
    [0b111, 0b101, 0b101, 0b111, 0b001], // Q
    [0b110, 0b101, 0b110, 0b101, 0b101], // R
    [0b111, 0b100, 0b111, 0b001, 0b111], // S
    [0b111, 0b010, 0b010, 0b010, 0b010], // T
    [0b101, 0b101, 0b101, 0b101, 0b111], // U
    [0b101, 0b101, 0b101, 0b101, 0b010], // V
    [0b101, 0b101, 0b111, 0b111, 0b101], // W
    [0b101, 0b101, 0b010, 0b101, 0b101], // X
    [0b101, 0b101, 0b010, 0b010, 0b010], // Y
    [0b111, 0b001, 0b010, 0b100, 0b111], // Z
    [0b110, 0b100, 0b100, 0b100, 0b110], // [
    [0b100, 0b100, 0b010, 0b001, 0b001], // \
    [0b011, 0b001, 0b001, 0b001, 0b011], // ]
    [0b010, 0b101, 0b000, 0b000, 0b000], // ^
    [0b000, 0b000, 0b000, 0b000, 0b111], // _
    [0b100, 0b010, 0b000, 0b000, 0b000], // `
    [0b000, 0b111, 0b001, 0b111, 0b111], // a
    [0b100, 0b100, 0b110, 0b101, 0b110], // b
    [0b000, 0b111, 0b100, 0b100, 0b111], // c
    [0b001, 0b001, 0b111, 0b101, 0b111], // d
    [0b000, 0b111, 0b110, 0b100, 0b111], // e
    [0b011, 0b100, 0b110, 0b100, 0b100], // f
    [0b000, 0b111, 0b101, 0b111, 0b001], // g
    [0b100, 0b100, 0b110, 0b101, 0b101], // h
    [0b010, 0b000, 0b010, 0b010, 0b010], // i
    [0b001, 0b000, 0b001, 0b101, 0b010], // j
    [0b100, 0b101, 0b110, 0b101, 0b101], // k
    [0b100, 0b100, 0b100, 0b100, 0b111], // l
    [0b000, 0b110, 0b111, 0b101, 0b101], // m
    [0b000, 0b110, 0b101, 0b101, 0b101], // n
    [0b000, 0b111, 0b101, 0b101, 0b111], // o
    [0b000, 0b110, 0b101, 0b110, 0b100], // p
    [0b000, 0b111, 0b101, 0b111, 0b001], // q
    [0b000, 0b110, 0b101, 0b100, 0b100], // r
    [0b000, 0b111, 0b110, 0b001, 0b111], // s
    [0b010, 0b111, 0b010, 0b010, 0b011], // t
    [0b000, 0b101, 0b101, 0b101, 0b111], // u
    [0b000, 0b101, 0b101, 0b101, 0b010], // v
    [0b000, 0b101, 0b101, 0b111, 0b010], // w
    [0b000, 0b101, 0b010, 0b010, 0b101], // x
    [0b000, 0b101, 0b101, 0b111, 0b001], // y
    [0b000, 0b111, 0b001, 0b010, 0b111], // z
    [0b011, 0b010, 0b110, 0b010, 0b011], // {
    [0b010, 0b010, 0b010, 0b010, 0b010], // |
    [0b110, 0b010, 0b011, 0b010, 0b110], // }
    [0b000, 0b011, 0b110, 0b000, 0b000], // ~
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::frame::BLACK;

    const WHITE: Color = [1.0, 1.0, 1.0, 1.0];

    fn lit_pixels(frame: &Frame) -> usize {
        frame
            .pixels()
            .chunks_exact(4)
            .filter(|px| px[0] > 0)
            .count()
    }

    #[test]
    fn every_printable_ascii_character_has_a_glyph() {
        for code in 32u8..=126u8 {
            assert!(glyph_rows(char::from(code)).is_some(), "missing {code}");
        }
        assert!(glyph_rows('\u{7f}').is_none());
        assert!(glyph_rows('é').is_none());
    }

    #[test]
    fn width_counts_gaps_between_glyphs_only() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("A", 2), 6);
        assert_eq!(text_width("AB", 2), 14);
        assert_eq!(line_height(3), 21);
    }

    #[test]
    fn right_aligned_text_ends_at_anchor() {
        let mut frame = Frame::new(40, 10);
        frame.clear(BLACK);
        draw_text(&mut frame, 20, 0, 1, Align::Right, "1", WHITE);
        // '1' has its middle column lit on the top row.
        assert_eq!(frame.pixel(18, 0).map(|px| px[0]), Some(255));
        assert_eq!(frame.pixel(20, 0).map(|px| px[0]), Some(0));
    }

    #[test]
    fn unknown_characters_draw_nothing_and_clipping_is_safe() {
        let mut frame = Frame::new(8, 8);
        frame.clear(BLACK);
        draw_text(&mut frame, 0, 0, 1, Align::Left, "\u{1f642}", WHITE);
        assert_eq!(lit_pixels(&frame), 0);
        draw_text(&mut frame, -5, -5, 3, Align::Center, "FPS", WHITE);
        draw_text(&mut frame, 64, 64, 3, Align::Left, "TPS", WHITE);
    }
}
