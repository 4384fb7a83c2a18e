//! Narration sequencer.
//!
//! One narration plays at a time: starting a new one supersedes the current
//! one (audio stopped, cue schedule dropped, no ended event). Requesting the
//! narration that is already playing is a no-op returning `false`. When the
//! audio backend is unavailable the narration still runs in degraded mode —
//! cues are scheduled off the tick clock and the ended event fires after the
//! last cue.

use crate::event::ScenarioEvent;
use crate::subtitles::{render, Cue, SubtitleError};

/// Handle to a playing sound, issued by the audio backend
pub type PlaybackId = u64;

#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("audio output unavailable")]
    AudioUnavailable,
    #[error("failed to load audio for '{id}': {reason}")]
    AudioLoad { id: String, reason: String },
}

/// Audio backend seam
pub trait AudioPlayer {
    fn play(&mut self, id: &str, volume: f32) -> Result<PlaybackId, NarrationError>;
    fn stop(&mut self, playback: PlaybackId);
    fn is_finished(&self, playback: PlaybackId) -> bool;
}

/// Caption loading seam
pub trait CaptionSource {
    fn load(&mut self, id: &str) -> Result<Vec<Cue>, SubtitleError>;
}

/// Playback volume for a narration id. Scene narrations are loud, ambient
/// radio chatter is quiet; the message overlays sit in between.
pub fn volume_for(id: &str) -> f32 {
    if id == "Radio1" || id == "Radio2" {
        0.15
    } else if id == "SceneGenerique" {
        0.2
    } else if id.starts_with("Scene99_Message") {
        0.4
    } else if id.starts_with("Scene") {
        0.8
    } else {
        0.1
    }
}

struct ActiveNarration {
    id: String,
    session: u64,
    cues: Vec<Cue>,
    elapsed_ms: u32,
    /// None when running in degraded (no-audio) mode
    playback: Option<PlaybackId>,
}

impl ActiveNarration {
    fn current_cue(&self) -> Option<&Cue> {
        self.cues
            .iter()
            .find(|c| self.elapsed_ms >= c.start_ms && self.elapsed_ms < c.end_ms)
    }

    fn last_cue_end(&self) -> u32 {
        self.cues.iter().map(|c| c.end_ms).max().unwrap_or(0)
    }
}

/// Plays narrations with synchronized captions
pub struct NarrationSequencer {
    audio: Box<dyn AudioPlayer>,
    captions: Box<dyn CaptionSource>,
    current: Option<ActiveNarration>,
    session_counter: u64,
    pending: Vec<ScenarioEvent>,
}

impl NarrationSequencer {
    pub fn new(audio: Box<dyn AudioPlayer>, captions: Box<dyn CaptionSource>) -> Self {
        Self {
            audio,
            captions,
            current: None,
            session_counter: 0,
            pending: Vec::new(),
        }
    }

    /// Start a narration. Returns false without side effects if this id is
    /// already the current narration; otherwise any running narration is
    /// superseded (no ended event for it).
    pub fn play(&mut self, id: &str) -> bool {
        if self.current.as_ref().is_some_and(|c| c.id == id) {
            tracing::debug!("Narration '{}' already playing, ignoring", id);
            return false;
        }

        if let Some(previous) = self.current.take() {
            tracing::info!("Narration '{}' superseded by '{}'", previous.id, id);
            if let Some(playback) = previous.playback {
                self.audio.stop(playback);
            }
        }

        let cues = match self.captions.load(id) {
            Ok(cues) => cues,
            Err(e) => {
                tracing::warn!("Captions for '{}' unavailable: {}", id, e);
                Vec::new()
            }
        };

        let playback = match self.audio.play(id, volume_for(id)) {
            Ok(playback) => Some(playback),
            Err(e) => {
                tracing::warn!("Audio for '{}' failed ({}), running degraded", id, e);
                None
            }
        };

        self.session_counter += 1;
        tracing::info!(
            "Narration '{}' started (session {})",
            id,
            self.session_counter
        );
        self.current = Some(ActiveNarration {
            id: id.to_string(),
            session: self.session_counter,
            cues,
            elapsed_ms: 0,
            playback,
        });
        self.pending
            .push(ScenarioEvent::NarrationStarted { id: id.to_string() });
        true
    }

    /// Stop the current narration without an ended event
    pub fn stop(&mut self) {
        if let Some(current) = self.current.take() {
            tracing::debug!("Narration '{}' stopped", current.id);
            if let Some(playback) = current.playback {
                self.audio.stop(playback);
            }
        }
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.id.as_str())
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.current.as_ref().is_some_and(|c| c.id == id)
    }

    /// The rendered subtitle to show right now, if a cue is active
    pub fn current_subtitle(&self) -> Option<String> {
        self.current
            .as_ref()
            .and_then(|c| c.current_cue())
            .map(|cue| render(&cue.text))
    }

    /// Advance the narration clock. Returns started/ended events.
    pub fn update(&mut self, dt_ms: u32) -> Vec<ScenarioEvent> {
        let mut events = std::mem::take(&mut self.pending);

        let ended = if let Some(current) = &mut self.current {
            current.elapsed_ms += dt_ms;
            match current.playback {
                Some(playback) => self.audio.is_finished(playback),
                // Degraded mode: done when the caption schedule runs out
                None => current.elapsed_ms >= current.last_cue_end(),
            }
        } else {
            false
        };

        if ended {
            if let Some(finished) = self.current.take() {
                tracing::info!(
                    "Narration '{}' ended (session {})",
                    finished.id,
                    finished.session
                );
                events.push(ScenarioEvent::NarrationEnded { id: finished.id });
            }
        }
        events
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    #[derive(Default)]
    pub struct MockAudioState {
        pub started: Vec<(String, f32)>,
        pub stopped: Vec<PlaybackId>,
        pub finished: HashSet<PlaybackId>,
        pub fail: bool,
        next: PlaybackId,
    }

    pub struct MockAudio(pub Rc<RefCell<MockAudioState>>);

    impl AudioPlayer for MockAudio {
        fn play(&mut self, id: &str, volume: f32) -> Result<PlaybackId, NarrationError> {
            let mut state = self.0.borrow_mut();
            if state.fail {
                return Err(NarrationError::AudioUnavailable);
            }
            state.next += 1;
            let playback = state.next;
            state.started.push((id.to_string(), volume));
            Ok(playback)
        }

        fn stop(&mut self, playback: PlaybackId) {
            self.0.borrow_mut().stopped.push(playback);
        }

        fn is_finished(&self, playback: PlaybackId) -> bool {
            self.0.borrow().finished.contains(&playback)
        }
    }

    pub struct MapCaptions(pub HashMap<String, Vec<Cue>>);

    impl CaptionSource for MapCaptions {
        fn load(&mut self, id: &str) -> Result<Vec<Cue>, SubtitleError> {
            Ok(self.0.get(id).cloned().unwrap_or_default())
        }
    }

    /// A sequencer wired to shared mock audio state, for tests across modules
    pub fn mock_sequencer(
        captions: HashMap<String, Vec<Cue>>,
        fail_audio: bool,
    ) -> (NarrationSequencer, Rc<RefCell<MockAudioState>>) {
        let state = Rc::new(RefCell::new(MockAudioState {
            fail: fail_audio,
            ..MockAudioState::default()
        }));
        let sequencer = NarrationSequencer::new(
            Box::new(MockAudio(state.clone())),
            Box::new(MapCaptions(captions)),
        );
        (sequencer, state)
    }

    pub fn cue(start_ms: u32, end_ms: u32, text: &str) -> Cue {
        Cue {
            start_ms,
            end_ms,
            text: text.to_string(),
        }
    }
}
