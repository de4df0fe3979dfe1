/// Short sounds played around a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    RecordingStart,
    RecordingStop,
}

/// Plays audio cues. Must return immediately; playback happens in the background.
pub trait CuePlayer: Send + Sync {
    fn play(&self, cue: CueKind);
}

/// Plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCue;

impl CuePlayer for SilentCue {
    fn play(&self, _cue: CueKind) {}
}
