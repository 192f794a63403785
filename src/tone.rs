use std::sync::{Arc, Mutex, mpsc};

use anyhow::Result;
use tokio::runtime::Runtime;

use crate::envelope::EnvelopeParams;
use crate::output::{AudioEngine, SharedPipeline, SynthPipeline};

/// The sound source driven by the session. Nothing it returns is consumed;
/// every call must be safe before and after initialization.
pub trait ToneEngine {
    /// Brings the engine up on first use. Later calls do nothing.
    fn ensure_ready(&mut self);
    fn is_ready(&self) -> bool;
    fn configure_envelope(&mut self, params: &EnvelopeParams);
    fn trigger_on(&mut self);
    fn trigger_off(&mut self);
    fn set_filter_cutoff(&mut self, hz: f64);
    fn set_filter_resonance(&mut self, q: f64);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToneCommand {
    ConfigureEnvelope(EnvelopeParams),
    GateOn,
    GateOff,
    SetCutoff(f32),
    SetResonance(f32),
}

fn spawn_command_worker(runtime: &Runtime, pipeline: SharedPipeline) -> mpsc::Sender<ToneCommand> {
    let (tx, rx) = mpsc::channel();
    runtime.spawn_blocking(move || {
        while let Ok(command) = rx.recv() {
            let Ok(mut guard) = pipeline.lock() else {
                log::error!("synth pipeline lock poisoned, stopping command worker");
                break;
            };
            guard.apply(command);
        }
    });
    tx
}

struct Running {
    commands: mpsc::Sender<ToneCommand>,
    _audio: AudioEngine,
    _runtime: Runtime,
}

enum EngineState {
    Pending,
    Running(Running),
    Failed,
}

/// cpal-backed engine, started lazily on the first gate press.
pub struct AudioToneEngine {
    state: EngineState,
    last_cutoff: Option<f32>,
    last_resonance: Option<f32>,
}

impl AudioToneEngine {
    pub fn new() -> Self {
        Self {
            state: EngineState::Pending,
            last_cutoff: None,
            last_resonance: None,
        }
    }

    fn start() -> Result<Running> {
        let runtime = Runtime::new()?;
        let pipeline = Arc::new(Mutex::new(SynthPipeline::new()));
        let audio = AudioEngine::start(pipeline.clone())?;
        let commands = spawn_command_worker(&runtime, pipeline);
        Ok(Running {
            commands,
            _audio: audio,
            _runtime: runtime,
        })
    }

    fn send(&mut self, command: ToneCommand) {
        if let EngineState::Running(running) = &self.state {
            if running.commands.send(command).is_err() {
                log::warn!("tone command worker is gone, dropping {command:?}");
            }
        }
    }
}

impl ToneEngine for AudioToneEngine {
    fn ensure_ready(&mut self) {
        if !matches!(self.state, EngineState::Pending) {
            return;
        }
        self.state = match Self::start() {
            Ok(running) => {
                log::info!("tone engine started");
                EngineState::Running(running)
            }
            Err(err) => {
                log::error!("tone engine unavailable, continuing silently: {err:#}");
                EngineState::Failed
            }
        };
    }

    fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Running(_))
    }

    fn configure_envelope(&mut self, params: &EnvelopeParams) {
        self.send(ToneCommand::ConfigureEnvelope(*params));
    }

    fn trigger_on(&mut self) {
        self.send(ToneCommand::GateOn);
    }

    fn trigger_off(&mut self) {
        self.send(ToneCommand::GateOff);
    }

    fn set_filter_cutoff(&mut self, hz: f64) {
        let hz = hz as f32;
        if !self.is_ready() || self.last_cutoff == Some(hz) {
            return;
        }
        self.last_cutoff = Some(hz);
        self.send(ToneCommand::SetCutoff(hz));
    }

    fn set_filter_resonance(&mut self, q: f64) {
        let q = q as f32;
        if !self.is_ready() || self.last_resonance == Some(q) {
            return;
        }
        self.last_resonance = Some(q);
        self.send(ToneCommand::SetResonance(q));
    }
}
