//! Scenario trigger table and fuzzy event resolution.
//!
//! Each scene of the walk declares how it fires (marker interaction or
//! interface action), what it requires, and what it does: narration,
//! animation, interface, follow-up interactions. Incoming events rarely
//! carry a clean scene id, so resolution works through the payload fields
//! in a fixed priority order, from exact ids down to substring heuristics.

use std::collections::HashSet;

use crate::event::TriggerPayload;
use crate::interaction::InteractionStore;

/// How a scene is triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// A marker/object interaction was detected in the scene
    InteractionDetected,
    /// An interface (scanner, capture) reported a result
    InterfaceAction,
}

/// Which overlay interface a scene opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Scanner,
    Capture,
}

/// A follow-up interaction in a chained sequence (the river rocks)
#[derive(Debug, Clone, Copy)]
pub struct NextInteraction {
    pub marker_id: &'static str,
    pub required_step: &'static str,
}

/// Animation request attached to a scene trigger
#[derive(Debug, Clone, Copy)]
pub struct AnimationCue {
    pub name: &'static str,
    pub duration: Option<f32>,
    pub height: Option<f32>,
    pub spread: Option<f32>,
}

/// Side effect run at the end of a scene trigger
#[derive(Debug, Clone, Copy)]
pub enum OnComplete {
    SetStep(&'static str),
    MarkNarrationTriggered(&'static str),
}

/// One scene of the scenario
#[derive(Debug, Clone, Copy)]
pub struct ScenarioEntry {
    pub scene_id: &'static str,
    pub trigger: TriggerKind,
    pub marker_id: Option<&'static str>,
    pub object_key: Option<&'static str>,
    /// Required result payload for interface-action triggers
    pub interface_result: Option<&'static str>,
    /// Narration that must have been triggered before this scene can fire
    pub requires_previous: Option<&'static str>,
    pub narration_id: Option<&'static str>,
    pub animation: Option<AnimationCue>,
    pub interface: Option<InterfaceKind>,
    pub next_interactions: &'static [NextInteraction],
    pub on_complete: Option<OnComplete>,
    pub repeatable: bool,
}

/// The scenario of the walk, in narrative order
pub static SCENARIO_CONFIG: [ScenarioEntry; 9] = [
    ScenarioEntry {
        scene_id: "Scene02_PanneauInformation",
        trigger: TriggerKind::InteractionDetected,
        marker_id: Some("DirectionPanelEndInteractive"),
        object_key: Some("DirectionPanelEndInteractive"),
        interface_result: None,
        requires_previous: None,
        narration_id: Some("Scene02_PanneauInformation"),
        animation: Some(AnimationCue {
            name: "camera-zoom",
            duration: None,
            height: None,
            spread: None,
        }),
        interface: None,
        next_interactions: &[],
        on_complete: None,
        repeatable: false,
    },
    ScenarioEntry {
        scene_id: "Scene03_SautAuDessusDeLArbre",
        trigger: TriggerKind::InteractionDetected,
        marker_id: Some("firstStop-marker"),
        object_key: Some("TrunkLargeInteractive"),
        interface_result: None,
        requires_previous: None,
        narration_id: Some("Scene03_SautAuDessusDeLArbre"),
        animation: Some(AnimationCue {
            name: "jump-animation",
            duration: None,
            height: None,
            spread: None,
        }),
        interface: None,
        next_interactions: &[],
        on_complete: None,
        repeatable: false,
    },
    ScenarioEntry {
        scene_id: "Scene04_RechercheDesIndices_part1",
        trigger: TriggerKind::InteractionDetected,
        marker_id: Some("thirdStop-marker"),
        object_key: Some("LeafErable"),
        interface_result: None,
        requires_previous: None,
        narration_id: Some("Scene04_RechercheDesIndices_part1"),
        animation: Some(AnimationCue {
            name: "leaf-scatter",
            duration: Some(1.2),
            height: None,
            spread: Some(1.5),
        }),
        interface: None,
        next_interactions: &[],
        on_complete: Some(OnComplete::SetStep("fifthStop")),
        repeatable: false,
    },
    ScenarioEntry {
        scene_id: "Scene04_RechercheDesIndices_part2",
        trigger: TriggerKind::InteractionDetected,
        marker_id: Some("fifthStop-marker"),
        object_key: Some("AnimalPaws"),
        interface_result: None,
        requires_previous: Some("Scene04_RechercheDesIndices_part1"),
        narration_id: Some("Scene04_RechercheDesIndices_part2"),
        animation: None,
        interface: Some(InterfaceKind::Scanner),
        next_interactions: &[],
        on_complete: Some(OnComplete::MarkNarrationTriggered(
            "Scene04_RechercheDesIndices_part2",
        )),
        repeatable: false,
    },
    ScenarioEntry {
        scene_id: "Scene04_RechercheDesIndices_part3",
        trigger: TriggerKind::InterfaceAction,
        marker_id: None,
        object_key: None,
        interface_result: Some("complete"),
        requires_previous: Some("Scene04_RechercheDesIndices_part2"),
        narration_id: Some("Scene04_RechercheDesIndices_part3"),
        animation: None,
        interface: None,
        next_interactions: &[],
        on_complete: None,
        repeatable: false,
    },
    ScenarioEntry {
        scene_id: "Scene05_SautAu-DessusDeLaRiviere",
        trigger: TriggerKind::InteractionDetected,
        marker_id: Some("JumpRock1"),
        object_key: Some("JumpRock1"),
        interface_result: None,
        requires_previous: None,
        narration_id: Some("Scene05_SautAu-DessusDeLaRiviere"),
        animation: Some(AnimationCue {
            name: "river-jump",
            duration: Some(0.8),
            height: Some(1.2),
            spread: None,
        }),
        interface: None,
        next_interactions: &[
            NextInteraction {
                marker_id: "JumpRock2",
                required_step: "twelfthStop",
            },
            NextInteraction {
                marker_id: "JumpRock3",
                required_step: "thirteenthStop",
            },
            NextInteraction {
                marker_id: "JumpRock4",
                required_step: "fourteenthStop",
            },
        ],
        on_complete: None,
        repeatable: false,
    },
    ScenarioEntry {
        scene_id: "Scene06_PassageEn-DessousDeLaBranche",
        trigger: TriggerKind::InteractionDetected,
        marker_id: Some("ThinTrunkInteractive"),
        object_key: Some("ThinTrunkInteractive"),
        interface_result: None,
        requires_previous: None,
        narration_id: Some("Scene06_PassageEn-DessousDeLaBranche"),
        animation: Some(AnimationCue {
            name: "duck-animation",
            duration: Some(1.0),
            height: None,
            spread: None,
        }),
        interface: None,
        next_interactions: &[],
        on_complete: None,
        repeatable: false,
    },
    ScenarioEntry {
        scene_id: "Scene08_DecouverteDuVisonMort",
        trigger: TriggerKind::InteractionDetected,
        marker_id: Some("sixthStop-marker"),
        object_key: Some("Vison"),
        interface_result: None,
        requires_previous: None,
        narration_id: Some("Scene08_DecouverteDuVisonMort"),
        animation: Some(AnimationCue {
            name: "camera-flash",
            duration: Some(1.0),
            height: None,
            spread: None,
        }),
        interface: Some(InterfaceKind::Capture),
        next_interactions: &[],
        on_complete: None,
        repeatable: false,
    },
    ScenarioEntry {
        scene_id: "Scene09_ClairiereDigitalisee",
        trigger: TriggerKind::InteractionDetected,
        marker_id: Some("tenthStop-marker"),
        object_key: Some("DirectionPanelEndInteractive"),
        interface_result: None,
        requires_previous: None,
        narration_id: Some("Scene09_ClairiereDigitalisee"),
        animation: Some(AnimationCue {
            name: "camera-zoom",
            duration: None,
            height: None,
            spread: None,
        }),
        interface: None,
        next_interactions: &[],
        on_complete: None,
        repeatable: false,
    },
];

/// River-rock prerequisites: each rock needs the interaction of the
/// previous rock's step completed (matched by key fragment).
pub const ROCK_PREREQUISITES: [(&str, &str); 3] = [
    ("JumpRock2", "eleventh"),
    ("JumpRock3", "twelfth"),
    ("JumpRock4", "thirteenth"),
];

/// Whether the rock named in `key` may be jumped from the current state.
/// Keys that are not guarded rocks always pass.
pub fn rock_guard_satisfied(key: &str, store: &InteractionStore) -> bool {
    for (rock, fragment) in ROCK_PREREQUISITES {
        if key.contains(rock) {
            let ok = store.has_completed_matching(fragment);
            if !ok {
                tracing::warn!(
                    "Rock '{}' refused: no completed interaction matching '{}'",
                    key,
                    fragment
                );
            }
            return ok;
        }
    }
    true
}

/// Resolves incoming trigger payloads to scenario entries and tracks which
/// scenes already fired.
pub struct TriggerResolver {
    triggered: HashSet<&'static str>,
}

impl TriggerResolver {
    pub fn new() -> Self {
        Self {
            triggered: HashSet::new(),
        }
    }

    pub fn entry(scene_id: &str) -> Option<&'static ScenarioEntry> {
        SCENARIO_CONFIG.iter().find(|e| e.scene_id == scene_id)
    }

    pub fn is_triggered(&self, scene_id: &str) -> bool {
        self.triggered.contains(scene_id)
    }

    /// Record that a scene fired
    pub fn mark_triggered(&mut self, entry: &ScenarioEntry) {
        self.triggered.insert(entry.scene_id);
    }

    /// Whether a scene may fire: not already triggered (unless repeatable),
    /// and its prerequisite narration (if any) already happened.
    pub fn can_trigger(&self, entry: &ScenarioEntry, store: &InteractionStore) -> bool {
        if self.triggered.contains(entry.scene_id) && !entry.repeatable {
            return false;
        }
        if let Some(previous) = entry.requires_previous {
            if !store.is_narration_triggered(previous) {
                tracing::debug!(
                    "Scene {} blocked, {} not yet triggered",
                    entry.scene_id,
                    previous
                );
                return false;
            }
        }
        true
    }

    /// Resolve a payload to a scenario entry.
    ///
    /// Priority order:
    /// 1. payload id equals an entry marker id (or a scene id outright)
    /// 2. payload marker id equals an entry marker id
    /// 3. payload object key equals an entry object key
    /// 4. an entry marker id contains the payload's required step
    /// 5. an entry marker id is a substring of the payload id
    /// 6. the payload id's leading token (before the first `-`) is
    ///    contained in an entry marker id
    pub fn resolve(&self, payload: &TriggerPayload) -> Option<&'static ScenarioEntry> {
        if let Some(id) = &payload.id {
            if let Some(entry) = SCENARIO_CONFIG
                .iter()
                .find(|e| e.marker_id == Some(id.as_str()))
            {
                tracing::debug!("Scene resolved by exact marker id: {}", entry.scene_id);
                return Some(entry);
            }
            if let Some(entry) = Self::entry(id) {
                tracing::debug!("Scene resolved by scene id: {}", entry.scene_id);
                return Some(entry);
            }
        }
        if let Some(marker_id) = &payload.marker_id {
            if let Some(entry) = SCENARIO_CONFIG
                .iter()
                .find(|e| e.marker_id == Some(marker_id.as_str()))
            {
                tracing::debug!("Scene resolved by marker id: {}", entry.scene_id);
                return Some(entry);
            }
        }
        if let Some(object_key) = &payload.object_key {
            if let Some(entry) = SCENARIO_CONFIG
                .iter()
                .find(|e| e.object_key == Some(object_key.as_str()))
            {
                tracing::debug!("Scene resolved by object key: {}", entry.scene_id);
                return Some(entry);
            }
        }
        if let Some(step) = &payload.required_step {
            if let Some(entry) = SCENARIO_CONFIG
                .iter()
                .find(|e| e.marker_id.is_some_and(|m| m.contains(step.as_str())))
            {
                tracing::debug!("Scene resolved by required step: {}", entry.scene_id);
                return Some(entry);
            }
        }
        if let Some(id) = &payload.id {
            if let Some(entry) = SCENARIO_CONFIG
                .iter()
                .find(|e| e.marker_id.is_some_and(|m| id.contains(m)))
            {
                tracing::debug!("Scene resolved by marker substring: {}", entry.scene_id);
                return Some(entry);
            }
            // Composite ids like "firstStop-marker-07": match the leading
            // token against the marker ids
            if let Some(token) = id.split('-').next() {
                if !token.is_empty() {
                    if let Some(entry) = SCENARIO_CONFIG
                        .iter()
                        .find(|e| e.marker_id.is_some_and(|m| m.contains(token)))
                    {
                        tracing::debug!("Scene resolved by step token: {}", entry.scene_id);
                        return Some(entry);
                    }
                }
            }
        }
        tracing::debug!("No scene matches payload {:?}", payload);
        None
    }

    /// Entries fired by an interface result (scanner close, capture done)
    pub fn resolve_interface(&self, result: &str) -> Vec<&'static ScenarioEntry> {
        SCENARIO_CONFIG
            .iter()
            .filter(|e| {
                e.trigger == TriggerKind::InterfaceAction && e.interface_result == Some(result)
            })
            .collect()
    }
}

impl Default for TriggerResolver {
    fn default() -> Self {
        Self::new()
    }
}
