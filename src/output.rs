use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use cpal::{
    SampleFormat, Stream,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use crate::tone::ToneCommand;
use crate::voice::Voice;

pub type SharedPipeline = Arc<Mutex<SynthPipeline>>;

/// Everything the audio callback renders, shared with the command worker.
pub struct SynthPipeline {
    voice: Voice,
}

impl SynthPipeline {
    pub fn new() -> Self {
        Self {
            voice: Voice::new(),
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.voice.set_sample_rate(rate);
    }

    pub fn apply(&mut self, command: ToneCommand) {
        match command {
            ToneCommand::ConfigureEnvelope(params) => self.voice.configure_envelope(params),
            ToneCommand::GateOn => self.voice.gate_on(),
            ToneCommand::GateOff => self.voice.gate_off(),
            ToneCommand::SetCutoff(hz) => self.voice.set_cutoff(hz),
            ToneCommand::SetResonance(q) => self.voice.set_resonance(q),
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        self.voice.next_sample()
    }
}

pub struct AudioEngine {
    _stream: Stream,
}

impl AudioEngine {
    pub fn start(pipeline: SharedPipeline) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default audio output"))?;
        let supported = device.default_output_config()?;
        let config = supported.config();
        let sample_rate = config.sample_rate.0 as f32;
        {
            let mut guard = pipeline
                .lock()
                .map_err(|_| anyhow!("synth pipeline lock poisoned"))?;
            guard.set_sample_rate(sample_rate);
        }
        log::info!(
            "audio output: {} Hz, {} channel(s), {:?}",
            sample_rate,
            config.channels,
            supported.sample_format()
        );
        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream(&device, &config, pipeline, |sample| sample)?,
            SampleFormat::I16 => build_stream(&device, &config, pipeline, |sample| {
                (sample * i16::MAX as f32) as i16
            })?,
            SampleFormat::U16 => build_stream(&device, &config, pipeline, |sample| {
                let scaled = (sample * 0.5 + 0.5).clamp(0.0, 1.0);
                (scaled * u16::MAX as f32) as u16
            })?,
            other => {
                log::warn!("unsupported sample format {other:?}, trying f32");
                build_stream(&device, &config, pipeline, |sample| sample)?
            }
        };
        stream.play()?;
        Ok(Self { _stream: stream })
    }
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    pipeline: SharedPipeline,
    convert: F,
) -> Result<Stream>
where
    T: cpal::SizedSample + Send + 'static,
    F: Fn(f32) -> T + Send + 'static,
{
    let channels = config.channels as usize;
    let stream = device.build_output_stream(
        config,
        move |output: &mut [T], _| {
            fill_output_buffer(output, channels, &pipeline, &convert);
        },
        move |err| log::error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn fill_output_buffer<T, F>(output: &mut [T], channels: usize, pipeline: &SharedPipeline, convert: &F)
where
    F: Fn(f32) -> T,
    T: Copy,
{
    let Ok(mut pipe) = pipeline.lock() else {
        let silence = convert(0.0);
        output.iter_mut().for_each(|slot| *slot = silence);
        return;
    };
    for frame in output.chunks_mut(channels.max(1)) {
        let sample = pipe.next_sample().clamp(-0.98, 0.98);
        let value = convert(sample);
        for channel in frame {
            *channel = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeParams;

    #[test]
    fn commands_reach_the_voice() {
        let pipeline: SharedPipeline = Arc::new(Mutex::new(SynthPipeline::new()));
        let mut buffer = vec![0.0f32; 512];
        fill_output_buffer(&mut buffer, 2, &pipeline, &|sample| sample);
        assert!(buffer.iter().all(|s| *s == 0.0));

        {
            let mut guard = pipeline.lock().unwrap();
            guard.set_sample_rate(48_000.0);
            guard.apply(ToneCommand::ConfigureEnvelope(EnvelopeParams {
                attack: 0.0,
                decay: 0.0,
                sustain: 1.0,
                release: 0.1,
            }));
            guard.apply(ToneCommand::SetCutoff(5_000.0));
            guard.apply(ToneCommand::GateOn);
        }
        fill_output_buffer(&mut buffer, 2, &pipeline, &|sample| sample);
        assert!(buffer.iter().any(|s| *s != 0.0));
        for frame in buffer.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn integer_conversion_stays_in_range() {
        let pipeline: SharedPipeline = Arc::new(Mutex::new(SynthPipeline::new()));
        pipeline.lock().unwrap().apply(ToneCommand::GateOn);
        let mut buffer = vec![0u16; 256];
        fill_output_buffer(&mut buffer, 1, &pipeline, &|sample: f32| {
            let scaled = (sample * 0.5 + 0.5).clamp(0.0, 1.0);
            (scaled * u16::MAX as f32) as u16
        });
        assert!(buffer.iter().all(|s| *s > 0));
    }
}
