//! Scripted sequences of scenario actions.
//!
//! A sequence advances one action at a time: narrations and animations block
//! until their ended/complete events arrive, interactions block until the
//! visitor completes them (checked on a half-second poll), delays count down
//! on the tick clock. A failing action is logged and skipped — one broken
//! asset must not stall the walk.

use crate::animation::{AnimationParams, AnimationRunner, RequestOutcome};
use crate::interaction::InteractionStore;
use crate::narration::NarrationSequencer;
use crate::stage::Stage;

/// How often a pending interaction is re-checked
pub const INTERACTION_POLL_MS: u32 = 500;

/// One step of a sequence
#[derive(Debug, Clone)]
pub enum SequenceAction {
    /// Play a narration (once per walk) and wait for it to end
    Narration(String),
    /// Start an animation and wait for it to complete
    Animation {
        name: String,
        target: Option<String>,
        params: AnimationParams,
    },
    /// Put the walk into interaction mode and wait for the visitor
    Interaction {
        step: String,
        target: Option<String>,
    },
    /// Wait a fixed time (ms)
    Delay(u32),
    /// Run an arbitrary store mutation, instantly
    Call(fn(&mut InteractionStore)),
}

#[derive(Debug)]
enum Waiting {
    Narration(String),
    Animation(String),
    Interaction { step: String, poll_remaining: u32 },
    Delay(u32),
}

/// Borrowed services a sequence drives
pub struct SequenceCtx<'a> {
    pub narration: &'a mut NarrationSequencer,
    pub animations: &'a mut AnimationRunner,
    pub store: &'a mut InteractionStore,
    pub stage: &'a mut dyn Stage,
}

/// A running sequence of scenario actions
pub struct Sequence {
    actions: Vec<SequenceAction>,
    current: usize,
    waiting: Option<Waiting>,
    finished: bool,
}

impl Sequence {
    pub fn new(actions: Vec<SequenceAction>) -> Self {
        Self {
            actions,
            current: 0,
            waiting: None,
            finished: false,
        }
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.is_some()
    }

    /// Notify that a narration ended
    pub fn on_narration_ended(&mut self, id: &str) {
        if matches!(&self.waiting, Some(Waiting::Narration(waiting)) if waiting == id) {
            self.waiting = None;
        }
    }

    /// Notify that an animation instance completed
    pub fn on_animation_complete(&mut self, instance_id: &str) {
        if matches!(&self.waiting, Some(Waiting::Animation(waiting)) if waiting == instance_id) {
            self.waiting = None;
        }
    }

    /// Advance timers: delays count down, pending interactions are polled
    pub fn tick(&mut self, dt_ms: u32, store: &InteractionStore) {
        match &mut self.waiting {
            Some(Waiting::Delay(remaining)) => {
                *remaining = remaining.saturating_sub(dt_ms);
                if *remaining == 0 {
                    self.waiting = None;
                }
            }
            Some(Waiting::Interaction {
                step,
                poll_remaining,
            }) => {
                *poll_remaining = poll_remaining.saturating_sub(dt_ms);
                if *poll_remaining == 0 {
                    if store.is_completed(step) {
                        self.waiting = None;
                    } else {
                        *poll_remaining = INTERACTION_POLL_MS;
                    }
                }
            }
            _ => {}
        }
    }

    /// Run as many actions as possible this frame
    pub fn advance(&mut self, ctx: &mut SequenceCtx<'_>) {
        while !self.finished && self.waiting.is_none() {
            let Some(action) = self.actions.get(self.current).cloned() else {
                self.finished = true;
                tracing::debug!("Sequence finished ({} actions)", self.actions.len());
                return;
            };
            self.current += 1;

            match action {
                SequenceAction::Narration(id) => {
                    // Each narration fires once per walk: an id already in
                    // the triggered set is skipped without touching audio.
                    if ctx.store.is_narration_triggered(&id) {
                        tracing::debug!("Sequence: narration '{}' already triggered, skipping", id);
                    } else {
                        ctx.store.set_narration_triggered(&id);
                        if ctx.narration.play(&id) {
                            self.waiting = Some(Waiting::Narration(id));
                        } else {
                            // Already playing this narration; nothing to wait on
                            tracing::debug!(
                                "Sequence: narration '{}' already active, skipping",
                                id
                            );
                        }
                    }
                }
                SequenceAction::Animation {
                    name,
                    target,
                    params,
                } => match ctx.animations.start(
                    &name,
                    target.as_deref(),
                    params,
                    ctx.stage,
                    ctx.store,
                ) {
                    RequestOutcome::Started { id } => {
                        self.waiting = Some(Waiting::Animation(id));
                    }
                    RequestOutcome::Refused { running } => {
                        tracing::warn!(
                            "Sequence: animation '{}' refused ('{}' running), continuing",
                            name,
                            running
                        );
                    }
                    RequestOutcome::UnknownAnimation => {
                        tracing::warn!("Sequence: unknown animation '{}', continuing", name);
                    }
                },
                SequenceAction::Interaction { step, target } => {
                    ctx.store.enter_interaction_mode(&step, target.as_deref());
                    self.waiting = Some(Waiting::Interaction {
                        step,
                        poll_remaining: INTERACTION_POLL_MS,
                    });
                }
                SequenceAction::Delay(ms) => {
                    if ms > 0 {
                        self.waiting = Some(Waiting::Delay(ms));
                    }
                }
                SequenceAction::Call(f) => f(ctx.store),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationRegistry;
    use crate::event::ScenarioEvent;
    use crate::narration::testing::mock_sequencer;
    use crate::stage::WorldState;
    use glam::Vec3;
    use std::collections::HashMap;

    struct Fixture {
        narration: NarrationSequencer,
        animations: AnimationRunner,
        store: InteractionStore,
        world: WorldState,
    }

    fn fixture() -> Fixture {
        let (narration, _) = mock_sequencer(HashMap::new(), true);
        let mut world = WorldState::new();
        world.add_object("TrunkLargeInteractive", Vec3::ZERO);
        Fixture {
            narration,
            animations: AnimationRunner::new(AnimationRegistry::with_defaults()),
            store: InteractionStore::new(),
            world,
        }
    }

    fn drive(seq: &mut Sequence, fx: &mut Fixture, dt_ms: u32) {
        // One frame: narration clock, animation clock, then the sequence
        let narration_events = fx.narration.update(dt_ms);
        let animation_events =
            fx.animations
                .update(dt_ms as f32, &mut fx.world, &mut fx.store);
        for event in narration_events.iter().chain(animation_events.iter()) {
            match event {
                ScenarioEvent::NarrationEnded { id } => seq.on_narration_ended(id),
                ScenarioEvent::AnimationComplete { id, .. } => seq.on_animation_complete(id),
                _ => {}
            }
        }
        fx.store.update(dt_ms);
        seq.tick(dt_ms, &fx.store);
        let mut ctx = SequenceCtx {
            narration: &mut fx.narration,
            animations: &mut fx.animations,
            store: &mut fx.store,
            stage: &mut fx.world,
        };
        seq.advance(&mut ctx);
    }

    #[test]
    fn delay_then_call_runs_in_order() {
        let mut fx = fixture();
        let mut seq = Sequence::new(vec![
            SequenceAction::Delay(100),
            SequenceAction::Call(|store| store.set_current_step("firstStop")),
        ]);

        drive(&mut seq, &mut fx, 33);
        assert_eq!(fx.store.current_step(), "initialStop");
        drive(&mut seq, &mut fx, 100);
        assert_eq!(fx.store.current_step(), "firstStop");
        assert!(seq.finished());
    }

    #[test]
    fn narration_blocks_until_ended() {
        let mut fx = fixture();
        // Degraded audio with no cues: narration ends on the next frame
        let mut seq = Sequence::new(vec![
            SequenceAction::Narration("Scene02_PanneauInformation".to_string()),
            SequenceAction::Call(|store| store.set_current_step("firstStop")),
        ]);

        drive(&mut seq, &mut fx, 33);
        assert!(seq.is_waiting());
        assert!(fx.store.is_narration_triggered("Scene02_PanneauInformation"));
        drive(&mut seq, &mut fx, 33);
        assert_eq!(fx.store.current_step(), "firstStop");
    }

    #[test]
    fn already_triggered_narration_is_not_replayed() {
        let mut fx = fixture();
        fx.store
            .set_narration_triggered("Scene02_PanneauInformation");

        let mut seq = Sequence::new(vec![
            SequenceAction::Narration("Scene02_PanneauInformation".to_string()),
            SequenceAction::Call(|store| store.set_current_step("firstStop")),
        ]);
        drive(&mut seq, &mut fx, 33);
        // No new narration session started; the sequence fell straight through
        assert_eq!(fx.narration.current_id(), None);
        assert_eq!(fx.store.current_step(), "firstStop");
        assert!(seq.finished());
    }

    #[test]
    fn duplicate_narration_continues_immediately() {
        let mut fx = fixture();
        fx.narration.play("Scene02_PanneauInformation");

        let mut seq = Sequence::new(vec![
            SequenceAction::Narration("Scene02_PanneauInformation".to_string()),
            SequenceAction::Call(|store| store.set_current_step("firstStop")),
        ]);
        let mut ctx = SequenceCtx {
            narration: &mut fx.narration,
            animations: &mut fx.animations,
            store: &mut fx.store,
            stage: &mut fx.world,
        };
        seq.advance(&mut ctx);
        // The duplicate play returned false, so the sequence fell through
        assert_eq!(fx.store.current_step(), "firstStop");
        assert!(seq.finished());
    }

    #[test]
    fn unknown_animation_is_skipped() {
        let mut fx = fixture();
        let mut seq = Sequence::new(vec![
            SequenceAction::Animation {
                name: "no-such-animation".to_string(),
                target: None,
                params: AnimationParams::default(),
            },
            SequenceAction::Call(|store| store.set_current_step("secondStop")),
        ]);
        drive(&mut seq, &mut fx, 33);
        assert_eq!(fx.store.current_step(), "secondStop");
    }

    #[test]
    fn animation_blocks_until_complete() {
        let mut fx = fixture();
        let mut seq = Sequence::new(vec![
            SequenceAction::Animation {
                name: "jump-animation".to_string(),
                target: Some("TrunkLargeInteractive".to_string()),
                params: AnimationParams::default(),
            },
            SequenceAction::Call(|store| store.set_current_step("secondStop")),
        ]);

        drive(&mut seq, &mut fx, 33);
        assert!(seq.is_waiting());
        drive(&mut seq, &mut fx, 500);
        assert!(seq.is_waiting());
        drive(&mut seq, &mut fx, 600);
        assert_eq!(fx.store.current_step(), "secondStop");
    }

    #[test]
    fn interaction_waits_for_completion_via_poll() {
        let mut fx = fixture();
        let mut seq = Sequence::new(vec![
            SequenceAction::Interaction {
                step: "eleventhStop".to_string(),
                target: Some("JumpRock1".to_string()),
            },
            SequenceAction::Call(|store| store.set_narration_triggered("after")),
        ]);

        drive(&mut seq, &mut fx, 33);
        assert!(fx.store.waiting_for_interaction());
        assert!(!fx.store.allow_scroll());

        // Visitor completes the interaction; sequence notices on next poll
        fx.store.complete_interaction();
        drive(&mut seq, &mut fx, 400);
        assert!(seq.is_waiting());
        drive(&mut seq, &mut fx, 200);
        assert!(fx.store.is_narration_triggered("after"));
        assert!(seq.finished());
    }
}
