//! Audio output via rodio.
//!
//! Narration files are m4a (decoded through symphonia), ambient bonus
//! one-shots are mp3. The engine keeps one sink per narration playback so the
//! sequencer can poll for completion; finished sinks are reaped from the tick
//! loop via [`SoundEngine::gc`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::rc::Rc;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use balade_common::AssetPaths;
use balade_scenario::{AudioPlayer, NarrationError, PlaybackId};

/// Central sound engine — manages the output stream and active sinks
pub struct SoundEngine {
    /// rodio output stream (must be kept alive)
    _stream: OutputStream,
    /// Handle for creating new sinks
    handle: OutputStreamHandle,
    /// Narration playbacks, by the id handed to the sequencer
    narration_sinks: HashMap<PlaybackId, Sink>,
    /// Ambient one-shots (kept alive until finished)
    bonus_sinks: Vec<Sink>,
    next_playback: PlaybackId,
    paths: AssetPaths,
    /// Master volume applied on top of per-narration volumes
    master_volume: f32,
}

impl SoundEngine {
    /// Create a new sound engine. Returns None if audio device unavailable.
    pub fn new(paths: AssetPaths, master_volume: f32) -> Option<Self> {
        match OutputStream::try_default() {
            Ok((stream, handle)) => {
                tracing::info!("Audio output initialized");
                Some(Self {
                    _stream: stream,
                    handle,
                    narration_sinks: HashMap::new(),
                    bonus_sinks: Vec::new(),
                    next_playback: 0,
                    paths,
                    master_volume: master_volume.clamp(0.0, 1.0),
                })
            }
            Err(e) => {
                tracing::warn!("Failed to initialize audio: {}", e);
                None
            }
        }
    }

    fn open(path: &Path) -> Result<Decoder<BufReader<File>>, String> {
        let file = File::open(path).map_err(|e| e.to_string())?;
        Decoder::new(BufReader::new(file)).map_err(|e| e.to_string())
    }

    /// Play an ambient bonus one-shot (bird calls, wind). Missing files and
    /// decode failures are logged and skipped.
    pub fn play_bonus(&mut self, id: &str) {
        let path = self.paths.bonus_audio(id);
        match Self::open(&path) {
            Ok(source) => match Sink::try_new(&self.handle) {
                Ok(sink) => {
                    sink.set_volume(0.1 * self.master_volume);
                    sink.append(source);
                    tracing::debug!("Ambient '{}' from {}", id, path.display());
                    self.bonus_sinks.push(sink);
                }
                Err(e) => tracing::warn!("Failed to create ambient sink: {}", e),
            },
            Err(e) => tracing::debug!("Ambient '{}' unavailable: {}", id, e),
        }
    }

    /// Clean up finished sinks (called periodically from the tick loop)
    pub fn gc(&mut self) {
        self.bonus_sinks.retain(|s| !s.empty());
        self.narration_sinks.retain(|_, s| !s.empty());
    }
}

impl AudioPlayer for SoundEngine {
    fn play(&mut self, id: &str, volume: f32) -> Result<PlaybackId, NarrationError> {
        let path = self.paths.narration_audio(id);
        let source = Self::open(&path).map_err(|reason| NarrationError::AudioLoad {
            id: id.to_string(),
            reason,
        })?;
        let sink = Sink::try_new(&self.handle).map_err(|e| {
            tracing::warn!("Failed to create narration sink: {}", e);
            NarrationError::AudioUnavailable
        })?;
        sink.set_volume(volume * self.master_volume);
        sink.append(source);
        self.next_playback += 1;
        self.narration_sinks.insert(self.next_playback, sink);
        Ok(self.next_playback)
    }

    fn stop(&mut self, playback: PlaybackId) {
        if let Some(sink) = self.narration_sinks.remove(&playback) {
            sink.stop();
        }
    }

    fn is_finished(&self, playback: PlaybackId) -> bool {
        self.narration_sinks
            .get(&playback)
            .map(|s| s.empty())
            .unwrap_or(true)
    }
}

/// Shared handle to the engine — the sequencer owns one end, the tick loop
/// keeps the other for ambient playback and gc.
pub struct SharedAudio(pub Rc<RefCell<SoundEngine>>);

impl AudioPlayer for SharedAudio {
    fn play(&mut self, id: &str, volume: f32) -> Result<PlaybackId, NarrationError> {
        self.0.borrow_mut().play(id, volume)
    }

    fn stop(&mut self, playback: PlaybackId) {
        self.0.borrow_mut().stop(playback);
    }

    fn is_finished(&self, playback: PlaybackId) -> bool {
        self.0.borrow().is_finished(playback)
    }
}

/// Backend used when audio is muted or no device exists — the sequencer
/// falls back to caption-clock (degraded) playback.
pub struct NullAudio;

impl AudioPlayer for NullAudio {
    fn play(&mut self, _id: &str, _volume: f32) -> Result<PlaybackId, NarrationError> {
        Err(NarrationError::AudioUnavailable)
    }

    fn stop(&mut self, _playback: PlaybackId) {}

    fn is_finished(&self, _playback: PlaybackId) -> bool {
        true
    }
}
