use serde::{Deserialize, Serialize};

/// Sounds the clock can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundId {
    Alarm,
    Tick,
}

/// Fire-and-forget playback capability supplied by the host.
pub trait AudioOutput {
    fn play(&mut self, sound: SoundId);

    /// Silences a sound that may still be playing. Hosts that cannot stop
    /// playback can ignore this.
    fn stop(&mut self, _sound: SoundId) {}
}

/// Output that remembers what it was asked to play.
#[derive(Debug, Default, Clone)]
pub struct RecordingOutput {
    played: Vec<SoundId>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> &[SoundId] {
        &self.played
    }
}

impl AudioOutput for RecordingOutput {
    fn play(&mut self, sound: SoundId) {
        self.played.push(sound);
    }
}
