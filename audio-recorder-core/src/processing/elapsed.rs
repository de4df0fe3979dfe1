/// Recording clock driven by hardware sample timestamps.
///
/// The anchor is taken from the first buffer after every (re)start, so
/// time spent paused never counts. Elapsed time is the accumulated value
/// from earlier segments plus the distance from the anchor to the start of
/// the current buffer. A pause folds in the end of the last buffer, so the
/// audio it carried stays counted.
#[derive(Debug, Clone, Default)]
pub struct ElapsedClock {
    accumulated: f64,
    anchor: Option<u64>,
    current: f64,
    segment_end: f64,
}

impl ElapsedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the buffer of `frames` frames starting at `sample_time`
    /// and return elapsed seconds at its start.
    pub fn observe(&mut self, sample_time: u64, frames: usize, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return self.current;
        }
        let anchor = *self.anchor.get_or_insert(sample_time);
        let rate = sample_rate as f64;
        let segment = sample_time.saturating_sub(anchor) as f64 / rate;
        // Hosts may restart sample counts; never go backwards.
        self.current = (self.accumulated + segment).max(self.current);
        self.segment_end = self.segment_end.max(self.current + frames as f64 / rate);
        self.current
    }

    /// Freeze the clock. The next `observe` resumes from the end of the
    /// last buffer seen.
    pub fn suspend(&mut self) {
        self.accumulated = self.segment_end.max(self.current);
        self.anchor = None;
    }

    /// Seconds of audio delivered so far, including the last buffer.
    pub fn recorded_secs(&self) -> f64 {
        self.segment_end.max(self.current)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.current
    }
}
