use macroquad::prelude::*;

use crate::controls::SliderId;

pub const SCREEN_WIDTH: f32 = 1112.0;
pub const SCREEN_HEIGHT: f32 = 744.0;
const MARGIN: f32 = 16.0;
const MAX_CANVAS_WIDTH: f32 = 1080.0;
const MAX_CANVAS_HEIGHT: f32 = 520.0;
const MIN_CANVAS_HEIGHT: f32 = 280.0;
const PANEL_PAD: f32 = 24.0;
const ENVELOPE_HEIGHT_RATIO: f32 = 0.6;
const CUTOFF_BAR_OFFSET: f32 = 60.0;
const CUTOFF_BAR_HEIGHT: f32 = 28.0;
const CONTROLS_HEIGHT: f32 = 176.0;
const CONTROL_ROW_HEIGHT: f32 = 38.0;
pub const CONTROL_LABEL_WIDTH: f32 = 110.0;
const CONTROL_VALUE_WIDTH: f32 = 90.0;
const SLIDER_HIT_SLOP: f32 = 10.0;

/// Screen rectangles for everything interactive, recomputed from the window size each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelLayout {
    pub canvas: Rect,
    pub envelope: Rect,
    pub cutoff_bar: Rect,
    pub slider_tracks: [Rect; SliderId::COUNT],
    pub gate_button: Rect,
}

impl PanelLayout {
    pub fn compute(screen_w: f32, screen_h: f32) -> Self {
        let canvas_w = (screen_w - MARGIN * 2.0).min(MAX_CANVAS_WIDTH).max(1.0);
        let canvas_h = (screen_h - MARGIN * 3.0 - CONTROLS_HEIGHT)
            .min(MAX_CANVAS_HEIGHT)
            .max(MIN_CANVAS_HEIGHT);
        let canvas = Rect::new(MARGIN, MARGIN, canvas_w, canvas_h);

        let inner_w = (canvas.w - PANEL_PAD * 2.0).max(1.0);
        let envelope = Rect::new(
            canvas.x + PANEL_PAD,
            canvas.y + PANEL_PAD,
            inner_w,
            canvas.h * ENVELOPE_HEIGHT_RATIO,
        );
        let cutoff_bar = Rect::new(
            canvas.x + PANEL_PAD,
            canvas.y + canvas.h - CUTOFF_BAR_OFFSET,
            inner_w,
            CUTOFF_BAR_HEIGHT,
        );

        let controls_top = canvas.y + canvas.h + MARGIN;
        let column_w = canvas.w * 0.5;
        let track_w = (column_w - CONTROL_LABEL_WIDTH - CONTROL_VALUE_WIDTH - MARGIN).max(40.0);
        let cell = |index: usize| {
            let column = index / 4;
            let row = index % 4;
            vec2(
                canvas.x + column as f32 * column_w,
                controls_top + row as f32 * CONTROL_ROW_HEIGHT,
            )
        };
        let slider_tracks = std::array::from_fn(|index| {
            let origin = cell(index);
            Rect::new(
                origin.x + CONTROL_LABEL_WIDTH,
                origin.y + CONTROL_ROW_HEIGHT * 0.5 - 3.0,
                track_w,
                6.0,
            )
        });
        let gate_origin = cell(SliderId::COUNT);
        let gate_button = Rect::new(
            gate_origin.x + CONTROL_LABEL_WIDTH,
            gate_origin.y + 4.0,
            track_w.min(180.0),
            CONTROL_ROW_HEIGHT - 8.0,
        );

        Self {
            canvas,
            envelope,
            cutoff_bar,
            slider_tracks,
            gate_button,
        }
    }

    pub fn slider_track(&self, id: SliderId) -> Rect {
        self.slider_tracks[id.index()]
    }

    pub fn slider_at(&self, position: Vec2) -> Option<SliderId> {
        SliderId::VALUES.into_iter().find(|id| {
            let track = self.slider_track(*id);
            let hit = Rect::new(
                track.x - SLIDER_HIT_SLOP,
                track.y - SLIDER_HIT_SLOP,
                track.w + SLIDER_HIT_SLOP * 2.0,
                track.h + SLIDER_HIT_SLOP * 2.0,
            );
            hit.contains(position)
        })
    }

    pub fn gate_button_contains(&self, position: Vec2) -> bool {
        self.gate_button.contains(position)
    }
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self::compute(SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}
