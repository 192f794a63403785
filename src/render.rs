use macroquad::miniquad::{CursorIcon, window::set_mouse_cursor};
use macroquad::prelude::*;

use crate::controls::SliderBank;
use crate::interaction::{DragTarget, HANDLE_RADIUS, PREVIEW_SUSTAIN_SEC, time_scale};
use crate::layout::{CONTROL_LABEL_WIDTH, PanelLayout};
use crate::mapping::{format_hz, hz_to_norm};
use crate::session::FrameSnapshot;

const fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color { r, g, b, a: 1.0 }
}

const BACKGROUND: Color = rgb(0.055, 0.059, 0.071);
const PANEL: Color = rgb(0.086, 0.094, 0.114);
const GRID: Color = rgb(0.118, 0.133, 0.165);
const ACCENT: Color = rgb(0.298, 0.761, 1.0);
const LEVEL: Color = rgb(0.494, 0.906, 0.529);
const MUTED: Color = rgb(0.604, 0.643, 0.698);
const HANDLE: Color = rgb(0.776, 0.816, 0.863);
const HANDLE_ACTIVE: Color = rgb(0.902, 0.929, 0.953);

const PANEL_RADIUS: f32 = 12.0;
const GRID_ROWS: usize = 6;
const GRID_COLS: usize = 16;
const DASH: f32 = 6.0;
const LABEL_SIZE: u16 = 16;
const CUTOFF_TICKS: [f64; 10] = [
    20.0, 50.0, 100.0, 200.0, 500.0, 1_000.0, 2_000.0, 5_000.0, 10_000.0, 20_000.0,
];

/// Draws a frame. Holds the cursor state so the OS cursor only changes on transitions.
#[derive(Debug, Default)]
pub struct Renderer {
    pointer_cursor: bool,
}

impl Renderer {
    pub fn draw(&mut self, layout: &PanelLayout, frame: &FrameSnapshot, sliders: &SliderBank) {
        clear_background(BACKGROUND);
        draw_panel(layout);
        draw_envelope(layout, frame);
        draw_cutoff_bar(layout, frame);
        draw_sliders(layout, sliders);
        draw_gate_button(layout, frame.gate.is_open);
        self.update_cursor(frame);
    }

    fn update_cursor(&mut self, frame: &FrameSnapshot) {
        let wants_pointer =
            frame.dragging != DragTarget::None || frame.hovered != DragTarget::None;
        if wants_pointer != self.pointer_cursor {
            self.pointer_cursor = wants_pointer;
            set_mouse_cursor(if wants_pointer {
                CursorIcon::Pointer
            } else {
                CursorIcon::Default
            });
        }
    }
}

fn draw_panel(layout: &PanelLayout) {
    let canvas = layout.canvas;
    draw_rounded_rect(canvas, PANEL_RADIUS, PANEL);
    for row in 1..GRID_ROWS {
        let y = canvas.y + canvas.h * row as f32 / GRID_ROWS as f32;
        draw_line(canvas.x, y, canvas.x + canvas.w, y, 1.0, GRID);
    }
    for col in 1..GRID_COLS {
        let x = canvas.x + canvas.w * col as f32 / GRID_COLS as f32;
        draw_line(x, canvas.y, x, canvas.y + canvas.h, 1.0, GRID);
    }
}

fn draw_envelope(layout: &PanelLayout, frame: &FrameSnapshot) {
    let env = layout.envelope;
    let params = &frame.params;
    let geometry = &frame.geometry;
    let bottom = env.y + env.h;

    let scale = time_scale(env.w, params);
    let sustain_end_x =
        env.x + ((params.attack + params.decay + PREVIEW_SUSTAIN_SEC) * scale) as f32;
    let sustain_y = geometry.sustain.y;

    draw_line(env.x, bottom, geometry.attack.x, geometry.attack.y, 2.0, ACCENT);
    draw_line(
        geometry.attack.x,
        geometry.attack.y,
        geometry.sustain.x,
        sustain_y,
        2.0,
        ACCENT,
    );
    draw_dashed_line(
        vec2(geometry.sustain.x, sustain_y),
        vec2(sustain_end_x, sustain_y),
        2.0,
        ACCENT,
    );
    draw_line(
        sustain_end_x,
        sustain_y,
        geometry.release.x,
        geometry.release.y,
        2.0,
        ACCENT,
    );

    let level = frame.level.clamp(0.0, 1.0) as f32;
    draw_circle(env.x + level * env.w, bottom - env.h * level, 3.0, LEVEL);

    for target in [DragTarget::Attack, DragTarget::Sustain, DragTarget::Release] {
        draw_handle(frame, target);
    }

    draw_text(
        "Envelope (ADSR): drag handles A, D/S, R",
        env.x + 2.0,
        env.y - 6.0,
        LABEL_SIZE as f32,
        MUTED,
    );
}

fn draw_cutoff_bar(layout: &PanelLayout, frame: &FrameSnapshot) {
    let bar = layout.cutoff_bar;
    let x_at = |hz: f64| bar.x + hz_to_norm(hz) as f32 * bar.w;
    let y = bar.y;

    draw_line(bar.x, y, bar.x + bar.w, y, 6.0, GRID);
    draw_line(
        frame.geometry.cutoff_min.x,
        y,
        frame.geometry.cutoff_max.x,
        y,
        6.0,
        ACCENT,
    );
    draw_circle(x_at(frame.cutoff_hz), y, 5.0, LEVEL);

    for hz in CUTOFF_TICKS {
        let x = x_at(hz);
        draw_line(x, y - 10.0, x, y + 10.0, 1.0, GRID);
        let label = format_hz(hz);
        let size = measure_text(&label, None, LABEL_SIZE, 1.0);
        draw_text(&label, x - size.width * 0.5, y + 26.0, LABEL_SIZE as f32, MUTED);
    }

    for target in [DragTarget::CutoffMin, DragTarget::CutoffMax] {
        draw_handle(frame, target);
    }

    let legend = format!(
        "Cutoff: {}  |  Range: {} – {}  |  Q {:.1}",
        format_hz(frame.cutoff_hz),
        format_hz(frame.range.min_hz()),
        format_hz(frame.range.max_hz()),
        frame.range.resonance_q()
    );
    draw_text(&legend, bar.x, y - 16.0, LABEL_SIZE as f32, MUTED);
}

fn draw_handle(frame: &FrameSnapshot, target: DragTarget) {
    let Some(position) = frame.geometry.position(target) else {
        return;
    };
    let active = frame.hovered == target || frame.dragging == target;
    let (fill, outline, thickness) = if active {
        (HANDLE_ACTIVE, ACCENT, 2.0)
    } else {
        (HANDLE, GRID, 1.0)
    };
    draw_circle(position.x, position.y, HANDLE_RADIUS, fill);
    draw_circle_lines(position.x, position.y, HANDLE_RADIUS, thickness, outline);
}

fn draw_sliders(layout: &PanelLayout, sliders: &SliderBank) {
    for slider in sliders.iter() {
        let track = layout.slider_track(slider.id());
        let center_y = track.y + track.h * 0.5;

        draw_text(
            slider.id().label(),
            track.x - CONTROL_LABEL_WIDTH,
            center_y + 5.0,
            LABEL_SIZE as f32,
            MUTED,
        );
        draw_rounded_rect(track, track.h * 0.5, GRID);
        let filled = Rect::new(track.x, track.y, track.w * slider.normalized(), track.h);
        if filled.w >= track.h {
            draw_rounded_rect(filled, track.h * 0.5, ACCENT);
        }
        draw_circle(track.x + filled.w, center_y, 7.0, HANDLE);
        draw_text(
            slider.label(),
            track.x + track.w + 14.0,
            center_y + 5.0,
            LABEL_SIZE as f32,
            HANDLE_ACTIVE,
        );
    }
}

fn draw_gate_button(layout: &PanelLayout, open: bool) {
    let rect = layout.gate_button;
    let (fill, text) = if open {
        (ACCENT, BACKGROUND)
    } else {
        (PANEL, HANDLE_ACTIVE)
    };
    draw_rounded_rect(rect, 8.0, fill);
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, ACCENT);
    draw_centered_text("Hold to Play", rect, LABEL_SIZE, text);
}

fn draw_dashed_line(from: Vec2, to: Vec2, thickness: f32, color: Color) {
    let length = from.distance(to);
    if length <= f32::EPSILON {
        return;
    }
    let direction = (to - from) / length;
    let mut start = 0.0_f32;
    while start < length {
        let end = (start + DASH).min(length);
        let a = from + direction * start;
        let b = from + direction * end;
        draw_line(a.x, a.y, b.x, b.y, thickness, color);
        start += DASH * 2.0;
    }
}

fn draw_rounded_rect(rect: Rect, radius: f32, color: Color) {
    let radius = radius.min(rect.w * 0.5).min(rect.h * 0.5);
    draw_rectangle(rect.x + radius, rect.y, rect.w - 2.0 * radius, rect.h, color);
    draw_rectangle(rect.x, rect.y + radius, rect.w, rect.h - 2.0 * radius, color);
    for (cx, cy) in [
        (rect.x + radius, rect.y + radius),
        (rect.x + rect.w - radius, rect.y + radius),
        (rect.x + radius, rect.y + rect.h - radius),
        (rect.x + rect.w - radius, rect.y + rect.h - radius),
    ] {
        draw_circle(cx, cy, radius, color);
    }
}

fn draw_centered_text(text: &str, rect: Rect, size: u16, color: Color) {
    let measure = measure_text(text, None, size, 1.0);
    let x = rect.x + rect.w * 0.5 - measure.width * 0.5;
    let y = rect.y + rect.h * 0.5 + measure.height * 0.5;
    draw_text_ex(
        text,
        x,
        y,
        TextParams {
            font_size: size,
            color,
            ..Default::default()
        },
    );
}
