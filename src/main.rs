mod controls;
mod envelope;
mod gate;
mod input;
mod interaction;
mod layout;
mod mapping;
mod output;
mod render;
mod session;
mod tone;
mod voice;

use input::InputState;
use layout::{PanelLayout, SCREEN_HEIGHT, SCREEN_WIDTH};
use macroquad::prelude::*;
use render::Renderer;
use session::Session;
use tone::AudioToneEngine;

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    simulate_mouse_with_touch(false);

    let layout = PanelLayout::compute(screen_width(), screen_height());
    let mut session = Session::new(AudioToneEngine::new(), layout);
    let mut input = InputState::default();
    let mut renderer = Renderer::default();
    log::info!("filter envelope ready; hold Space, Z or the on-screen button to play");

    loop {
        let now = get_time();
        session.set_layout(PanelLayout::compute(screen_width(), screen_height()));

        let events = input.poll();
        for event in events.pointer {
            session.handle_pointer(event, now);
        }
        for event in events.gate {
            session.handle_gate(event, now);
        }

        let frame = session.tick(now);
        renderer.draw(session.layout(), &frame, session.sliders());

        next_frame().await;
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Filter Envelope".into(),
        fullscreen: false,
        sample_count: 4,
        window_width: SCREEN_WIDTH as i32,
        window_height: SCREEN_HEIGHT as i32,
        high_dpi: false,
        window_resizable: true,
        ..Default::default()
    }
}
