//! Scenario director — owns the managers and routes events between them.
//!
//! External systems feed events in through [`Director::dispatch`]; the
//! director resolves triggers, runs scene effects, and applies the
//! post-completion routing that moves the walk forward (which step follows
//! which animation or narration). Every event is also forwarded to the bus
//! so outside observers can subscribe.

use crate::animation::{AnimationParams, AnimationRegistry, AnimationRunner, RequestOutcome};
use crate::event::{EventBus, ScenarioEvent, TriggerPayload};
use crate::interaction::InteractionStore;
use crate::narration::NarrationSequencer;
use crate::sequence::{Sequence, SequenceCtx};
use crate::stage::Stage;
use crate::triggers::{
    rock_guard_satisfied, InterfaceKind, OnComplete, ScenarioEntry, TriggerResolver,
};

pub struct Director {
    pub bus: EventBus,
    pub store: InteractionStore,
    pub narration: NarrationSequencer,
    pub animations: AnimationRunner,
    resolver: TriggerResolver,
    sequences: Vec<Sequence>,
}

impl Director {
    pub fn new(narration: NarrationSequencer) -> Self {
        Self {
            bus: EventBus::new(),
            store: InteractionStore::new(),
            narration,
            animations: AnimationRunner::new(AnimationRegistry::with_defaults()),
            resolver: TriggerResolver::new(),
            sequences: Vec::new(),
        }
    }

    /// Mark the systems ready: the bus replays queued events and observers
    /// learn the scenario is live.
    pub fn start(&mut self, stage: &mut dyn Stage) {
        self.bus.mark_ready();
        self.dispatch(ScenarioEvent::ScenarioInitialized, stage);
        tracing::info!("Scenario initialized");
    }

    pub fn resolver(&self) -> &TriggerResolver {
        &self.resolver
    }

    /// Queue a scripted sequence; it advances during [`update`](Self::update)
    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.sequences.push(sequence);
    }

    pub fn sequences_finished(&self) -> bool {
        self.sequences.iter().all(Sequence::finished)
    }

    /// Feed an event into the scenario systems
    pub fn dispatch(&mut self, event: ScenarioEvent, stage: &mut dyn Stage) {
        self.route(&event, stage);
        self.bus.trigger(event);
    }

    /// Advance every manager by one frame
    pub fn update(&mut self, dt_ms: u32, stage: &mut dyn Stage) {
        self.store.update(dt_ms);

        let narration_events = self.narration.update(dt_ms);
        for event in narration_events {
            self.route(&event, stage);
            self.bus.trigger(event);
        }

        let animation_events = self
            .animations
            .update(dt_ms as f32, stage, &mut self.store);
        for event in animation_events {
            self.route(&event, stage);
            self.bus.trigger(event);
        }

        let mut sequences = std::mem::take(&mut self.sequences);
        for sequence in &mut sequences {
            sequence.tick(dt_ms, &self.store);
            let mut ctx = SequenceCtx {
                narration: &mut self.narration,
                animations: &mut self.animations,
                store: &mut self.store,
                stage: &mut *stage,
            };
            sequence.advance(&mut ctx);
        }
        self.sequences = sequences;
    }

    fn route(&mut self, event: &ScenarioEvent, stage: &mut dyn Stage) {
        match event {
            ScenarioEvent::InteractionDetected(payload) => {
                self.handle_trigger(payload, stage);
            }
            ScenarioEvent::MarkerClick(payload) => {
                // Clicks resolve but only interaction-detected events fire
                // scenes; a mismatch is a logged non-match.
                if let Some(entry) = self.resolver.resolve(payload) {
                    tracing::debug!(
                        "marker:click matches scene {} but its trigger is {:?}",
                        entry.scene_id,
                        entry.trigger
                    );
                }
            }
            ScenarioEvent::InterfaceAction {
                interface,
                action,
                result,
            } => {
                if let Some(result) = result {
                    let entries: Vec<&'static ScenarioEntry> =
                        self.resolver.resolve_interface(result);
                    for entry in entries {
                        self.trigger_scene(entry, stage);
                    }
                }
                if interface == "scanner"
                    && action == "close"
                    && result.as_deref() == Some("complete")
                {
                    self.on_scanner_complete();
                }
            }
            ScenarioEvent::AnimationComplete { name, target, id } => {
                for sequence in &mut self.sequences {
                    sequence.on_animation_complete(id);
                }
                self.on_animation_complete(name, target.as_deref());
            }
            ScenarioEvent::NarrationEnded { id } => {
                for sequence in &mut self.sequences {
                    sequence.on_narration_ended(id);
                }
                self.on_narration_ended(id);
            }
            ScenarioEvent::AnimationTrigger {
                name,
                target,
                params,
            } => {
                self.animations
                    .start(name, target.as_deref(), params.clone(), stage, &mut self.store);
            }
            _ => {}
        }
    }

    /// Resolve an interaction event to a scene and fire it
    fn handle_trigger(&mut self, payload: &TriggerPayload, stage: &mut dyn Stage) {
        // The later river rocks are not scenes of their own; they chain off
        // Scene05 and are guarded by the previous rock's interaction.
        let key = payload
            .object_key
            .as_deref()
            .or(payload.id.as_deref())
            .or(payload.marker_id.as_deref());
        if let Some(key) = key {
            if key.contains("JumpRock") && !key.contains("JumpRock1") {
                self.handle_rock_jump(key.to_string(), stage);
                return;
            }
        }

        // A pending interaction completes when its target shows up (or when
        // the wait is untargeted).
        if self.store.waiting_for_interaction() {
            let matches = match (key, self.store.interaction_target()) {
                (Some(key), Some(target)) => key.contains(target) || target.contains(key),
                (Some(_), None) => true,
                _ => false,
            };
            if matches && self.store.exit_interaction_mode().is_some() {
                self.bus
                    .trigger(ScenarioEvent::InteractionComplete(payload.clone()));
            }
        }

        let Some(entry) = self.resolver.resolve(payload) else {
            return;
        };
        self.trigger_scene(entry, stage);
    }

    /// Jump from one of the chained river rocks (JumpRock2..4)
    fn handle_rock_jump(&mut self, key: String, stage: &mut dyn Stage) {
        if !rock_guard_satisfied(&key, &self.store) {
            return;
        }
        let Some(entry) = TriggerResolver::entry("Scene05_SautAu-DessusDeLaRiviere") else {
            return;
        };
        let Some(next) = entry
            .next_interactions
            .iter()
            .find(|n| key.contains(n.marker_id))
        else {
            return;
        };
        if self.store.current_step() != next.required_step {
            tracing::warn!(
                "Rock '{}' refused: expected step {}, at {}",
                key,
                next.required_step,
                self.store.current_step()
            );
            return;
        }
        if self.store.exit_interaction_mode().is_some() {
            self.bus
                .trigger(ScenarioEvent::InteractionComplete(TriggerPayload::with_id(
                    &key,
                )));
        }

        let mut params = AnimationParams::default();
        if let Some(cue) = entry.animation {
            params.duration = cue.duration;
            if let Some(height) = cue.height {
                params.height = height;
            }
        }
        self.animations
            .start("river-jump", Some(&key), params, stage, &mut self.store);
    }

    /// Fire a scene: mark triggered, play narration, run animation, open
    /// interface, arm the next chained interaction, then the completion hook.
    fn trigger_scene(&mut self, entry: &'static ScenarioEntry, stage: &mut dyn Stage) {
        if !self.resolver.can_trigger(entry, &self.store) {
            tracing::debug!("Scene {} cannot trigger now", entry.scene_id);
            return;
        }
        tracing::info!("Triggering scene {}", entry.scene_id);

        self.resolver.mark_triggered(entry);
        self.store.set_narration_triggered(entry.scene_id);

        if let Some(narration_id) = entry.narration_id {
            self.narration.play(narration_id);
        }

        if let Some(cue) = entry.animation {
            let mut params = AnimationParams::default();
            params.duration = cue.duration;
            if let Some(height) = cue.height {
                params.height = height;
            }
            if let Some(spread) = cue.spread {
                params.spread = spread;
            }
            let target = entry.object_key.or(entry.marker_id);
            match self
                .animations
                .start(cue.name, target, params, stage, &mut self.store)
            {
                RequestOutcome::Started { .. } => {}
                outcome => {
                    tracing::warn!(
                        "Scene {}: animation '{}' not started ({:?})",
                        entry.scene_id,
                        cue.name,
                        outcome
                    );
                }
            }
        }

        match entry.interface {
            Some(InterfaceKind::Scanner) => self.store.set_show_scanner_interface(true),
            Some(InterfaceKind::Capture) => self.store.set_show_capture_interface(true),
            None => {}
        }

        if let Some(next) = entry.next_interactions.first() {
            self.store.set_current_step(next.required_step);
            self.store.set_waiting_for_interaction(true);
        }

        match entry.on_complete {
            Some(OnComplete::SetStep(step)) => self.store.set_current_step(step),
            Some(OnComplete::MarkNarrationTriggered(id)) => {
                self.store.set_narration_triggered(id)
            }
            None => {}
        }
    }

    /// Post-animation routing: which step follows which completed animation
    fn on_animation_complete(&mut self, name: &str, target: Option<&str>) {
        let target_contains = |needle: &str| target.is_some_and(|t| t.contains(needle));

        match name {
            "jump-animation" if target_contains("TrunkLarge") => {
                self.store.set_current_step("secondStop");
                self.store.set_allow_scroll(true);
            }
            "leaf-scatter" if target_contains("LeafErable") => {
                self.store.set_current_step("fifthStop");
            }
            "river-jump" => {
                let rock_index: u32 = target
                    .map(|t| t.chars().filter(char::is_ascii_digit).collect::<String>())
                    .and_then(|digits| digits.parse().ok())
                    .unwrap_or(0);
                let next = match rock_index {
                    1 => Some("twelfthStop"),
                    2 => Some("thirteenthStop"),
                    3 => Some("fourteenthStop"),
                    4 => Some("fourthStop"),
                    _ => None,
                };
                if let Some(step) = next {
                    self.store.set_current_step(step);
                    self.store.set_waiting_for_interaction(true);
                }
            }
            "duck-animation" if target_contains("ThinTrunk") => {
                self.store.set_current_step("tenthStop");
                self.store.set_allow_scroll(true);
            }
            _ => {}
        }
    }

    /// Post-narration routing
    fn on_narration_ended(&mut self, id: &str) {
        match id {
            "Scene03_SautAuDessusDeLArbre" => self.store.set_current_step("thirdStop"),
            "Scene04_RechercheDesIndices_part1" => self.store.set_current_step("fifthStop"),
            "Scene04_RechercheDesIndices_part3" => {
                // The river crossing starts here: arm the first rock unless
                // the visitor already jumped it
                if !self.store.is_completed("eleventhStop") {
                    self.store
                        .enter_interaction_mode("eleventhStop", Some("JumpRock1"));
                }
            }
            "Scene05_SautAu-DessusDeLaRiviere" => self.store.set_current_step("twelfthStop"),
            "Scene06_PassageEn-DessousDeLaBranche" => self.store.set_current_step("tenthStop"),
            _ => {}
        }
    }

    /// Scanner closed with a completed scan: the third clue narration plays
    /// once the second one has been heard.
    fn on_scanner_complete(&mut self) {
        self.store.set_show_scanner_interface(false);
        if self
            .store
            .is_narration_triggered("Scene04_RechercheDesIndices_part2")
        {
            self.narration.play("Scene04_RechercheDesIndices_part3");
            self.store
                .set_narration_triggered("Scene04_RechercheDesIndices_part3");
            self.store
                .enter_interaction_mode("eleventhStop", Some("JumpRock1"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::testing::mock_sequencer;
    use crate::stage::WorldState;
    use glam::Vec3;
    use std::collections::HashMap;

    fn forest() -> WorldState {
        let mut world = WorldState::new();
        world.add_object("DirectionPanelEndInteractive", Vec3::new(0.0, 0.0, 1.0));
        world.add_object("TrunkLargeInteractive", Vec3::new(0.0, 0.0, 3.0));
        let pile = world.add_object("LeafErable", Vec3::new(0.0, 0.0, 5.0));
        world.add_child(pile, "leaf_0", Vec3::new(0.0, 0.0, 5.0));
        world.add_object("AnimalPaws", Vec3::new(0.0, 0.0, 5.2));
        for i in 1..=4 {
            world.add_object(&format!("JumpRock{i}"), Vec3::new(0.0, 0.0, 6.0 + i as f32));
        }
        world.add_object("ThinTrunkInteractive", Vec3::new(0.0, 0.0, 11.0));
        world.add_object("Vison", Vec3::new(0.0, 0.0, 12.0));
        world
    }

    /// Director with degraded audio (narrations end right after starting)
    fn director() -> Director {
        let (narration, _) = mock_sequencer(HashMap::new(), true);
        Director::new(narration)
    }

    /// Director whose narrations never end (mock audio stays busy)
    fn director_with_audio() -> Director {
        let (narration, _) = mock_sequencer(HashMap::new(), false);
        Director::new(narration)
    }

    fn run(d: &mut Director, world: &mut WorldState, ms: u32) {
        let mut remaining = ms;
        while remaining > 0 {
            let dt = remaining.min(33);
            d.update(dt, world);
            remaining -= dt;
        }
    }

    #[test]
    fn trunk_jump_scene_end_to_end() {
        let mut world = forest();
        let mut d = director_with_audio();
        d.start(&mut world);

        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload {
                marker_id: Some("firstStop-marker".to_string()),
                ..TriggerPayload::default()
            }),
            &mut world,
        );

        assert!(d.narration.is_playing("Scene03_SautAuDessusDeLArbre"));
        assert!(d.animations.is_running("jump-animation"));
        assert!(!d.store.allow_scroll());

        run(&mut d, &mut world, 1200);
        assert_eq!(d.store.current_step(), "secondStop");
        assert!(d.store.allow_scroll());
    }

    #[test]
    fn scene_triggers_only_once() {
        let mut world = forest();
        let mut d = director_with_audio();
        d.start(&mut world);

        let payload = TriggerPayload::with_object_key("TrunkLargeInteractive");
        d.dispatch(
            ScenarioEvent::InteractionDetected(payload.clone()),
            &mut world,
        );
        run(&mut d, &mut world, 1200);
        d.dispatch(ScenarioEvent::InteractionDetected(payload), &mut world);
        assert!(!d.animations.is_running("jump-animation"));
    }

    #[test]
    fn narration_end_routes_to_third_stop() {
        let mut world = forest();
        let mut d = director();
        d.start(&mut world);

        // Degraded audio, no cues: the narration ends on the next frame
        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload {
                marker_id: Some("firstStop-marker".to_string()),
                ..TriggerPayload::default()
            }),
            &mut world,
        );
        d.update(33, &mut world);
        assert_eq!(d.store.current_step(), "thirdStop");
    }

    #[test]
    fn leaf_scatter_reveals_paws_then_scanner_gates_part3() {
        let mut world = forest();
        let mut d = director_with_audio();
        d.start(&mut world);

        // Scanner completion before part2: nothing happens
        d.dispatch(
            ScenarioEvent::InterfaceAction {
                interface: "scanner".to_string(),
                action: "close".to_string(),
                result: Some("complete".to_string()),
            },
            &mut world,
        );
        assert!(!d.narration.is_playing("Scene04_RechercheDesIndices_part3"));

        // Part 1: leaf scatter
        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("LeafErable")),
            &mut world,
        );
        run(&mut d, &mut world, 1400);
        assert_eq!(d.store.current_step(), "fifthStop");

        // Part 2: scanner opens and its trigger is recorded
        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("AnimalPaws")),
            &mut world,
        );
        assert!(d.store.show_scanner_interface());
        assert!(d
            .store
            .is_narration_triggered("Scene04_RechercheDesIndices_part2"));

        // Scanner completes: part 3 plays, step advances
        d.dispatch(
            ScenarioEvent::InterfaceAction {
                interface: "scanner".to_string(),
                action: "close".to_string(),
                result: Some("complete".to_string()),
            },
            &mut world,
        );
        assert!(d.narration.is_playing("Scene04_RechercheDesIndices_part3"));
        assert_eq!(d.store.current_step(), "eleventhStop");
        assert!(!d.store.show_scanner_interface());
    }

    #[test]
    fn part2_requires_part1() {
        let mut world = forest();
        let mut d = director_with_audio();
        d.start(&mut world);

        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("AnimalPaws")),
            &mut world,
        );
        assert!(!d.store.show_scanner_interface());
        assert!(!d
            .store
            .is_narration_triggered("Scene04_RechercheDesIndices_part2"));
    }

    #[test]
    fn river_rocks_chain_with_guards() {
        let mut world = forest();
        let mut d = director_with_audio();
        d.start(&mut world);

        // Jumping rock 2 out of order is refused
        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("JumpRock2")),
            &mut world,
        );
        assert!(!d.animations.is_running("river-jump"));

        // Scene05 fires on rock 1 and arms rock 2
        d.store.set_current_step("eleventhStop");
        d.store.set_waiting_for_interaction(true);
        d.store.complete_interaction();
        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("JumpRock1")),
            &mut world,
        );
        assert!(d.animations.is_running("river-jump"));
        assert_eq!(d.store.current_step(), "twelfthStop");
        assert!(d.store.waiting_for_interaction());

        // Rock 2 is now allowed; its jump lands on thirteenthStop
        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("JumpRock2")),
            &mut world,
        );
        assert!(d.animations.is_running("river-jump"));
        run(&mut d, &mut world, 1000);
        assert_eq!(d.store.current_step(), "thirteenthStop");
        assert!(d.store.waiting_for_interaction());
    }

    #[test]
    fn scanner_flow_arms_first_rock_and_unlocks_the_chain() {
        let mut world = forest();
        let mut d = director_with_audio();
        d.start(&mut world);

        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("LeafErable")),
            &mut world,
        );
        run(&mut d, &mut world, 1400);
        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("AnimalPaws")),
            &mut world,
        );
        d.dispatch(
            ScenarioEvent::InterfaceAction {
                interface: "scanner".to_string(),
                action: "close".to_string(),
                result: Some("complete".to_string()),
            },
            &mut world,
        );
        assert!(d.store.waiting_for_interaction());
        assert_eq!(d.store.interaction_target(), Some("JumpRock1"));

        // Jumping rock 1 completes the pending interaction, which is the
        // prerequisite for rock 2
        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("JumpRock1")),
            &mut world,
        );
        assert!(d.store.is_completed("eleventhStop"));
        run(&mut d, &mut world, 1000);
        assert_eq!(d.store.current_step(), "twelfthStop");

        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("JumpRock2")),
            &mut world,
        );
        assert!(d.animations.is_running("river-jump"));
    }

    #[test]
    fn duck_under_branch_routes_to_tenth_stop() {
        let mut world = forest();
        let mut d = director_with_audio();
        d.start(&mut world);

        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key(
                "ThinTrunkInteractive",
            )),
            &mut world,
        );
        run(&mut d, &mut world, 1200);
        assert_eq!(d.store.current_step(), "tenthStop");
        assert!(d.store.allow_scroll());
    }

    #[test]
    fn capture_scene_flashes_and_opens_interface() {
        let mut world = forest();
        let mut d = director_with_audio();
        d.start(&mut world);

        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key("Vison")),
            &mut world,
        );
        assert!(d.store.show_capture_interface());
        assert!(d.animations.is_running("camera-flash"));
    }

    #[test]
    fn marker_click_does_not_fire_scenes() {
        let mut world = forest();
        let mut d = director_with_audio();
        d.start(&mut world);

        d.dispatch(
            ScenarioEvent::MarkerClick(TriggerPayload::with_object_key("TrunkLargeInteractive")),
            &mut world,
        );
        assert!(!d.animations.is_running("jump-animation"));
        assert!(d.narration.current_id().is_none());
    }

    #[test]
    fn events_reach_bus_observers() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut world = forest();
        let mut d = director_with_audio();
        let seen = Rc::new(RefCell::new(0));
        let s = seen.clone();
        d.bus.on(crate::event::EventKind::AnimationComplete, move |_| {
            *s.borrow_mut() += 1
        });
        d.start(&mut world);

        d.dispatch(
            ScenarioEvent::InteractionDetected(TriggerPayload::with_object_key(
                "TrunkLargeInteractive",
            )),
            &mut world,
        );
        run(&mut d, &mut world, 1200);
        assert_eq!(*seen.borrow(), 1);
    }
}
