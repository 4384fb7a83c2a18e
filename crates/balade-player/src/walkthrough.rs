//! Scripted demo walk.
//!
//! Stands in for the scroll-and-click frontend: fires the marker and
//! interface events a visitor would produce at each stop, and simulates
//! scrolling by advancing the step once the walk is idle. The script only
//! says WHERE the visitor acts — step changes, narration chaining and
//! animation gating all come from the scenario itself.

use std::collections::VecDeque;

use balade_scenario::{Director, ScenarioEvent, Stage, TriggerPayload};

/// Dwell before the simulated visitor scrolls on (ms)
const SCROLL_DWELL_MS: u32 = 2000;
/// Pause before the visitor acts at a stop they just reached (ms)
const REACTION_MS: u32 = 700;

fn detect(id: &str) -> ScenarioEvent {
    ScenarioEvent::InteractionDetected(TriggerPayload::with_id(id))
}

/// The full walk, from the information panel to the digitised clearing
fn script() -> VecDeque<(&'static str, ScenarioEvent)> {
    VecDeque::from(vec![
        ("initialStop", detect("DirectionPanelEndInteractive")),
        ("firstStop", detect("firstStop-marker")),
        ("thirdStop", detect("thirdStop-marker")),
        ("fifthStop", detect("fifthStop-marker")),
        (
            "fifthStop",
            ScenarioEvent::InterfaceAction {
                interface: "scanner".to_string(),
                action: "close".to_string(),
                result: Some("complete".to_string()),
            },
        ),
        ("eleventhStop", detect("JumpRock1")),
        ("twelfthStop", detect("JumpRock2")),
        ("thirteenthStop", detect("JumpRock3")),
        ("fourteenthStop", detect("JumpRock4")),
        ("fourthStop", detect("sixthStop-marker")),
        ("fourthStop", detect("ThinTrunkInteractive")),
        ("tenthStop", detect("tenthStop-marker")),
    ])
}

/// Drives the scenario the way a visitor would
pub struct Walkthrough {
    script: VecDeque<(&'static str, ScenarioEvent)>,
    reaction_ms: u32,
    dwell_ms: u32,
    last_step: String,
}

impl Walkthrough {
    pub fn new() -> Self {
        Self {
            script: script(),
            reaction_ms: REACTION_MS,
            dwell_ms: SCROLL_DWELL_MS,
            last_step: String::new(),
        }
    }

    /// The walk is over once the script ran dry and nothing is playing
    pub fn finished(&self, director: &Director) -> bool {
        self.script.is_empty()
            && director.narration.current_id().is_none()
            && director.animations.active_count() == 0
    }

    pub fn tick(&mut self, dt_ms: u32, director: &mut Director, stage: &mut dyn Stage) {
        let step = director.store.current_step().to_string();
        if step != self.last_step {
            tracing::info!("Arrived at {}", step);
            self.last_step = step.clone();
            self.reaction_ms = REACTION_MS;
            self.dwell_ms = SCROLL_DWELL_MS;
        }

        // The visitor waits out narrations and animations before acting
        let idle = director.narration.current_id().is_none()
            && director.animations.active_count() == 0;
        if !idle {
            return;
        }

        if let Some((at_step, _)) = self.script.front() {
            if *at_step == step {
                self.reaction_ms = self.reaction_ms.saturating_sub(dt_ms);
                if self.reaction_ms == 0 {
                    if let Some((_, event)) = self.script.pop_front() {
                        tracing::info!("Visitor acts at {}: {}", step, event.kind().name());
                        director.dispatch(event, stage);
                    }
                    self.reaction_ms = REACTION_MS;
                    self.dwell_ms = SCROLL_DWELL_MS;
                }
                return;
            }
        }

        // Simulated scroll: nothing to do here, walk on after a dwell
        if director.store.allow_scroll() && !director.store.waiting_for_interaction() {
            self.dwell_ms = self.dwell_ms.saturating_sub(dt_ms);
            if self.dwell_ms == 0 {
                if let Some(next) = director.store.advance_step() {
                    tracing::info!("Scrolling on to {}", next);
                }
                self.dwell_ms = SCROLL_DWELL_MS;
            }
        }
    }
}
