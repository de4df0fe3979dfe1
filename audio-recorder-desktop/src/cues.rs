//! Synthesized start/stop cues played through rodio.

use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{OutputStreamHandle, Sink};

use audio_recorder_core::traits::audio_cue::{CueKind, CuePlayer};

const AMPLITUDE: f32 = 0.3;

/// Plays a short two-note chime for each cue without blocking the caller.
pub struct RodioCuePlayer {
    output: OutputStreamHandle,
}

impl RodioCuePlayer {
    pub fn new(output: OutputStreamHandle) -> Self {
        Self { output }
    }
}

/// Sine tone with a short fade-in so it does not click.
fn gentle_tone(freq: f32, duration_ms: u64) -> impl Source<Item = f32> + Send {
    let fade_ms = (duration_ms / 5).min(30);
    SineWave::new(freq)
        .take_duration(Duration::from_millis(duration_ms))
        .fade_in(Duration::from_millis(fade_ms))
        .amplify(AMPLITUDE)
}

/// Note frequencies (Hz) for a cue: C5 up to E5 on start, back down on stop.
fn notes(cue: CueKind) -> [f32; 2] {
    match cue {
        CueKind::RecordingStart => [523.0, 659.0],
        CueKind::RecordingStop => [659.0, 523.0],
    }
}

impl CuePlayer for RodioCuePlayer {
    fn play(&self, cue: CueKind) {
        let sink = match Sink::try_new(&self.output) {
            Ok(sink) => sink,
            Err(e) => {
                log::warn!("Cannot play {:?} cue: {}", cue, e);
                return;
            }
        };
        let [first, second] = notes(cue);
        sink.append(gentle_tone(first, 80));
        sink.append(gentle_tone(second, 120));
        sink.detach();
    }
}
