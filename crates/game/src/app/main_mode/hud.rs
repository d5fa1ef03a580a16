use engine::app::rendering::{draw_text, line_height, Align, Color, Frame, TextureCache, BLACK};

use super::tally::BonusLine;
use crate::app::player::Player;

const PANEL_TEXTURE: &str = "left_panel.png";
const LIFE_TEXTURE: &str = "life.png";
const NO_LIFE_TEXTURE: &str = "nolife.png";
const PANEL_FALLBACK: Color = [0.85, 0.85, 0.8, 0.85];
const LIFE_FALLBACK: Color = [0.85, 0.25, 0.2, 1.0];
const NO_LIFE_FALLBACK: Color = [0.3, 0.3, 0.3, 0.6];
const WHITE: Color = [1.0, 1.0, 1.0, 1.0];

const LIFE_ICONS: i32 = 4;
const TEXT_RIGHT_EDGE: i32 = 152;
const BAR_X: i32 = 8;
const BAR_Y: i32 = 3;
const BAR_WIDTH: f32 = 144.0;
const BAR_HEIGHT: i32 = 5;

/// Text scale for a point size: 8 maps to 2, 16 to 4.
pub(crate) const fn text_scale(size: i32) -> i32 {
    size / 4
}

pub(crate) const SMALL_TEXT: i32 = text_scale(8);
pub(crate) const LARGE_TEXT: i32 = text_scale(16);

pub(crate) fn format_timer(seconds: i32) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Last fifteen seconds blink white on odd seconds.
pub(crate) fn timer_color(seconds: i32) -> Color {
    if seconds < 15 && seconds % 2 == 1 {
        WHITE
    } else {
        BLACK
    }
}

pub(crate) fn draw_hud(frame: &mut Frame, textures: &mut TextureCache, player: &Player) {
    draw_texture_or(frame, textures, PANEL_TEXTURE, (0, 0, 256, 128), PANEL_FALLBACK);
    for index in 0..LIFE_ICONS {
        let (name, fallback) = if index < player.lives {
            (LIFE_TEXTURE, LIFE_FALLBACK)
        } else {
            (NO_LIFE_TEXTURE, NO_LIFE_FALLBACK)
        };
        draw_texture_or(frame, textures, name, (63 + index * 20, 7, 32, 32), fallback);
    }

    draw_text(
        frame,
        TEXT_RIGHT_EDGE,
        52,
        SMALL_TEXT,
        Align::Right,
        &player.score.to_string(),
        BLACK,
    );
    let seconds = player.seconds_left();
    draw_text(
        frame,
        TEXT_RIGHT_EDGE,
        81,
        SMALL_TEXT,
        Align::Right,
        &format_timer(seconds),
        timer_color(seconds),
    );

    frame.fill_rect(BAR_X, BAR_Y, BAR_WIDTH as i32, BAR_HEIGHT, [0.5, 0.1, 0.1, 1.0]);
    let health = player.health.clamp(0.0, 1.0);
    frame.fill_horizontal_gradient(
        BAR_X,
        BAR_Y,
        (BAR_WIDTH * health) as i32,
        BAR_HEIGHT,
        [0.8, 0.8, 0.1, 1.0],
        [0.8, 0.1, 0.1, 1.0],
    );
    let missing_oxygen = 1.0 - player.oxygen.clamp(0.0, 1.0);
    frame.fill_rect(
        BAR_X,
        BAR_Y,
        (BAR_WIDTH * missing_oxygen) as i32,
        BAR_HEIGHT,
        [0.2, 0.2, 0.7, 0.8],
    );
}

fn draw_texture_or(
    frame: &mut Frame,
    textures: &mut TextureCache,
    name: &str,
    (x, y, width, height): (i32, i32, i32, i32),
    fallback: Color,
) {
    match textures.get(name) {
        Some(texture) => frame.draw_textured_rect(x, y, width, height, texture, WHITE),
        None => frame.fill_rect(x, y, width, height, fallback),
    }
}

/// Large title with a smaller line underneath, centred on screen.
pub(crate) fn draw_message(frame: &mut Frame, title: &str, subtitle: &str) {
    let (width, height) = frame.size();
    let center_x = width as i32 / 2;
    let center_y = height as i32 / 2;
    draw_text(
        frame,
        center_x,
        center_y - line_height(LARGE_TEXT),
        LARGE_TEXT,
        Align::Center,
        title,
        WHITE,
    );
    draw_text(
        frame,
        center_x,
        center_y + line_height(SMALL_TEXT) / 2,
        SMALL_TEXT,
        Align::Center,
        subtitle,
        WHITE,
    );
}

/// Label/value pairs split around the screen centre, then a footer.
pub(crate) fn draw_multi_message(frame: &mut Frame, rows: &[(&str, &str)], footer: &str) {
    let (width, height) = frame.size();
    let center_x = width as i32 / 2;
    let row_height = line_height(LARGE_TEXT);
    let mut y = height as i32 / 2 - row_height * rows.len() as i32;
    for (label, value) in rows {
        draw_text(frame, center_x - 8, y, LARGE_TEXT, Align::Right, label, WHITE);
        draw_text(frame, center_x + 8, y, LARGE_TEXT, Align::Left, value, WHITE);
        y += row_height;
    }
    draw_text(
        frame,
        center_x,
        y + row_height / 2,
        SMALL_TEXT,
        Align::Center,
        footer,
        WHITE,
    );
}

pub(crate) fn draw_bonus_lines(frame: &mut Frame, lines: &[BonusLine]) {
    let (width, height) = frame.size();
    let center_x = width as i32 / 2;
    let row_height = line_height(LARGE_TEXT);
    let mut y = height as i32 / 2 - row_height * 2;
    for line in lines {
        if line.value.is_empty() {
            draw_text(frame, center_x, y, LARGE_TEXT, Align::Center, &line.label, WHITE);
        } else {
            draw_text(frame, center_x - 8, y, SMALL_TEXT, Align::Right, &line.label, WHITE);
            draw_text(frame, center_x + 8, y, SMALL_TEXT, Align::Left, &line.value, WHITE);
        }
        y += row_height;
    }
}

pub(crate) fn draw_pause(frame: &mut Frame, fade: f32) {
    let (width, height) = frame.size();
    frame.fill_rect(0, 0, width as i32, height as i32, [0.0, 0.0, 0.0, fade]);
    draw_text(
        frame,
        width as i32 / 2,
        height as i32 / 2 - 16,
        LARGE_TEXT,
        Align::Center,
        "Paused",
        [1.0, 1.0, 1.0, 0.75],
    );
}

/// Blue wash over the screen while the ball is frozen.
pub(crate) fn draw_frozen_tint(frame: &mut Frame, frozen: f32) {
    if frozen <= 0.0 {
        return;
    }
    let (width, height) = frame.size();
    frame.fill_rect(
        0,
        0,
        width as i32,
        height as i32,
        [0.5, 0.5, 1.0, 0.5 * frozen.min(1.0)],
    );
}

pub(crate) fn draw_fps(frame: &mut Frame, fps: f32) {
    let width = frame.width() as i32;
    draw_text(
        frame,
        width - 4,
        4,
        SMALL_TEXT,
        Align::Right,
        &format!("{fps:.1} fps"),
        WHITE,
    );
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn timer_formats_minutes_and_seconds() {
        assert_eq!(format_timer(125), "02:05");
        assert_eq!(format_timer(0), "00:00");
        assert_eq!(format_timer(-3), "00:00");
    }

    #[test]
    fn timer_blinks_only_in_the_last_fifteen_seconds() {
        assert_eq!(timer_color(13), WHITE);
        assert_eq!(timer_color(14), BLACK);
        assert_eq!(timer_color(15), BLACK);
        assert_eq!(timer_color(17), BLACK);
    }

    #[test]
    fn text_sizes_map_to_scales() {
        assert_eq!(SMALL_TEXT, 2);
        assert_eq!(LARGE_TEXT, 4);
    }

    #[test]
    fn hud_falls_back_to_flat_colours_without_textures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut textures = TextureCache::new(dir.path());
        let mut frame = Frame::new(320, 240);
        frame.clear(BLACK);
        let mut player = Player::new(Vec3::ZERO, 2, 90.0);
        player.health = 0.5;
        player.oxygen = 1.0;
        draw_hud(&mut frame, &mut textures, &player);

        // Filled and empty life icons differ.
        let filled = frame.pixel(70, 30).expect("pixel");
        let empty = frame.pixel(130, 30).expect("pixel");
        assert_ne!(filled, empty);
        // Health bar covers half the width; the rest shows the dark backing.
        let health = frame.pixel(BAR_X as u32 + 10, BAR_Y as u32 + 1).expect("pixel");
        let backing = frame.pixel(BAR_X as u32 + 130, BAR_Y as u32 + 1).expect("pixel");
        assert_ne!(health, backing);
    }

    #[test]
    fn score_and_timer_use_the_small_font() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut textures = TextureCache::new(dir.path());
        let mut frame = Frame::new(320, 240);
        frame.clear(WHITE);
        let mut player = Player::new(Vec3::ZERO, 2, 90.0);
        player.score = 8;
        draw_hud(&mut frame, &mut textures, &player);

        let black = [0, 0, 0, 255];
        assert_eq!(frame.pixel(145, 53), Some(black));
        // Nothing dark between the score row and the timer row.
        for y in 63..81 {
            for x in 120..TEXT_RIGHT_EDGE as u32 {
                assert_ne!(frame.pixel(x, y), Some(black), "text at ({x}, {y})");
            }
        }
    }

    #[test]
    fn frozen_tint_is_skipped_when_thawed() {
        let mut frame = Frame::new(8, 8);
        frame.clear(BLACK);
        draw_frozen_tint(&mut frame, 0.0);
        assert_eq!(frame.pixel(4, 4), Some([0, 0, 0, 255]));
        draw_frozen_tint(&mut frame, 2.0);
        assert_ne!(frame.pixel(4, 4), Some([0, 0, 0, 255]));
    }
}
