//! Scenario coordination core for the Balade forest walk.
//!
//! A scroll-driven narrative walk is a handful of cooperating systems:
//! an event bus ([`event`]), an animation registry and runner
//! ([`animation`]), a narration sequencer with WebVTT captions
//! ([`narration`], [`subtitles`]), an interaction step machine
//! ([`interaction`]), a trigger table with fuzzy event resolution
//! ([`triggers`]) and scripted sequences ([`sequence`]). The [`director`]
//! owns them all and drives them from a single-threaded tick loop.

pub mod animation;
pub mod director;
pub mod event;
pub mod interaction;
pub mod markers;
pub mod narration;
pub mod sequence;
pub mod stage;
pub mod subtitles;
pub mod triggers;

pub use animation::{AnimationParams, AnimationRegistry, AnimationRunner, RequestOutcome};
pub use director::Director;
pub use event::{EventBus, EventKind, ListenerId, ScenarioEvent, TriggerPayload};
pub use interaction::{InteractionStore, SCROLL_RESTORE_DELAY_MS};
pub use narration::{AudioPlayer, CaptionSource, NarrationError, NarrationSequencer, PlaybackId};
pub use sequence::{Sequence, SequenceAction};
pub use stage::{ObjectHandle, Stage, WorldState};
pub use subtitles::{Cue, SubtitleError};
pub use triggers::{ScenarioEntry, TriggerResolver, SCENARIO_CONFIG};
