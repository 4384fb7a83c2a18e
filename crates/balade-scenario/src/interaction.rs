//! Interaction step state machine.
//!
//! Tracks where the visitor is along the walk (`current_step`), whether an
//! interaction is pending, whether scrolling is allowed, and which
//! interactions and narrations have already fired. Scroll is restored half a
//! second after an interaction completes so the camera does not lurch the
//! instant the visitor finishes.

use std::collections::{HashMap, HashSet};

/// Delay before scrolling is re-enabled after a completed interaction
pub const SCROLL_RESTORE_DELAY_MS: u32 = 500;

/// The fixed step progression of the walk. The ordering is intentional:
/// numbered stops were laid out along the path before the route was
/// re-sequenced, so the walk visits them out of numeric order.
pub fn next_step(step: &str) -> Option<&'static str> {
    Some(match step {
        "initialStop" => "firstStop",
        "firstStop" => "secondStop",
        "secondStop" => "thirdStop",
        "thirdStop" => "fifthStop",
        "fifthStop" => "eleventhStop",
        "eleventhStop" => "twelfthStop",
        "twelfthStop" => "thirteenthStop",
        "thirteenthStop" => "fourteenthStop",
        "fourteenthStop" => "fourthStop",
        "fourthStop" => "tenthStop",
        _ => return None,
    })
}

/// Shared interaction state for the walk
pub struct InteractionStore {
    current_step: String,
    waiting_for_interaction: bool,
    interaction_target: Option<String>,
    allow_scroll: bool,
    completed: HashMap<String, bool>,
    show_capture_interface: bool,
    show_scanner_interface: bool,
    triggered_narrations: HashSet<String>,
    scroll_restore_ms: Option<u32>,
}

impl InteractionStore {
    pub fn new() -> Self {
        Self {
            current_step: "initialStop".to_string(),
            waiting_for_interaction: false,
            interaction_target: None,
            allow_scroll: true,
            completed: HashMap::new(),
            show_capture_interface: false,
            show_scanner_interface: false,
            triggered_narrations: HashSet::new(),
            scroll_restore_ms: None,
        }
    }

    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    pub fn set_current_step(&mut self, step: &str) {
        if self.current_step != step {
            tracing::debug!("Step: {} -> {}", self.current_step, step);
            self.current_step = step.to_string();
        }
    }

    /// Move to the next step of the fixed progression, returning it
    pub fn advance_step(&mut self) -> Option<&'static str> {
        let next = next_step(&self.current_step)?;
        self.set_current_step(next);
        Some(next)
    }

    pub fn waiting_for_interaction(&self) -> bool {
        self.waiting_for_interaction
    }

    pub fn set_waiting_for_interaction(&mut self, waiting: bool) {
        self.waiting_for_interaction = waiting;
    }

    pub fn interaction_target(&self) -> Option<&str> {
        self.interaction_target.as_deref()
    }

    pub fn set_interaction_target(&mut self, target: Option<&str>) {
        self.interaction_target = target.map(str::to_string);
    }

    pub fn allow_scroll(&self) -> bool {
        self.allow_scroll
    }

    pub fn set_allow_scroll(&mut self, allow: bool) {
        self.allow_scroll = allow;
        if allow {
            self.scroll_restore_ms = None;
        }
    }

    pub fn show_capture_interface(&self) -> bool {
        self.show_capture_interface
    }

    pub fn set_show_capture_interface(&mut self, show: bool) {
        self.show_capture_interface = show;
    }

    pub fn show_scanner_interface(&self) -> bool {
        self.show_scanner_interface
    }

    pub fn set_show_scanner_interface(&mut self, show: bool) {
        self.show_scanner_interface = show;
    }

    pub fn is_completed(&self, step: &str) -> bool {
        self.completed.get(step).copied().unwrap_or(false)
    }

    /// Whether any completed interaction's step key contains `fragment`
    /// (used by the river-rock prerequisite checks).
    pub fn has_completed_matching(&self, fragment: &str) -> bool {
        self.completed
            .iter()
            .any(|(step, &done)| done && step.contains(fragment))
    }

    pub fn set_narration_triggered(&mut self, id: &str) {
        if self.triggered_narrations.insert(id.to_string()) {
            tracing::debug!("Narration triggered: {}", id);
        }
    }

    pub fn is_narration_triggered(&self, id: &str) -> bool {
        self.triggered_narrations.contains(id)
    }

    /// Complete the pending interaction at the current step.
    ///
    /// Does nothing unless an interaction is actually pending. Marks the
    /// current step completed, clears the waiting state and target, and
    /// schedules the scroll restore. Returns the completed step.
    pub fn complete_interaction(&mut self) -> Option<String> {
        if !self.waiting_for_interaction {
            return None;
        }
        let step = self.current_step.clone();
        tracing::info!("Interaction completed at {}", step);
        self.completed.insert(step.clone(), true);
        self.waiting_for_interaction = false;
        self.interaction_target = None;
        self.scroll_restore_ms = Some(SCROLL_RESTORE_DELAY_MS);
        Some(step)
    }

    /// Put the walk into interaction mode: step set, interaction pending,
    /// scrolling locked.
    pub fn enter_interaction_mode(&mut self, step: &str, target: Option<&str>) {
        self.set_current_step(step);
        self.waiting_for_interaction = true;
        self.interaction_target = target.map(str::to_string);
        self.allow_scroll = false;
        self.scroll_restore_ms = None;
    }

    /// Complete the pending interaction and let the scroll restore timer run
    pub fn exit_interaction_mode(&mut self) -> Option<String> {
        self.complete_interaction()
    }

    /// Advance timers. Call once per frame.
    pub fn update(&mut self, dt_ms: u32) {
        if let Some(remaining) = self.scroll_restore_ms {
            let remaining = remaining.saturating_sub(dt_ms);
            if remaining == 0 {
                self.scroll_restore_ms = None;
                self.allow_scroll = true;
                tracing::debug!("Scroll re-enabled");
            } else {
                self.scroll_restore_ms = Some(remaining);
            }
        }
    }
}

impl Default for InteractionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progression_has_intentional_skips() {
        assert_eq!(next_step("thirdStop"), Some("fifthStop"));
        assert_eq!(next_step("fourteenthStop"), Some("fourthStop"));
        assert_eq!(next_step("fourthStop"), Some("tenthStop"));
        assert_eq!(next_step("tenthStop"), None);
    }

    #[test]
    fn full_walk_order() {
        let mut store = InteractionStore::new();
        let mut visited = vec![store.current_step().to_string()];
        while let Some(step) = store.advance_step() {
            visited.push(step.to_string());
        }
        assert_eq!(
            visited,
            vec![
                "initialStop",
                "firstStop",
                "secondStop",
                "thirdStop",
                "fifthStop",
                "eleventhStop",
                "twelfthStop",
                "thirteenthStop",
                "fourteenthStop",
                "fourthStop",
                "tenthStop",
            ]
        );
    }

    #[test]
    fn complete_requires_pending_interaction() {
        let mut store = InteractionStore::new();
        assert_eq!(store.complete_interaction(), None);

        store.enter_interaction_mode("firstStop", Some("TrunkLargeInteractive"));
        assert!(!store.allow_scroll());
        assert_eq!(store.complete_interaction(), Some("firstStop".to_string()));
        assert!(store.is_completed("firstStop"));
        assert!(!store.waiting_for_interaction());
        assert_eq!(store.interaction_target(), None);
    }

    #[test]
    fn scroll_restores_after_delay() {
        let mut store = InteractionStore::new();
        store.enter_interaction_mode("eleventhStop", None);
        store.complete_interaction();

        assert!(!store.allow_scroll());
        store.update(300);
        assert!(!store.allow_scroll());
        store.update(200);
        assert!(store.allow_scroll());
    }

    #[test]
    fn completed_matching_by_fragment() {
        let mut store = InteractionStore::new();
        store.enter_interaction_mode("eleventhStop", None);
        store.complete_interaction();
        assert!(store.has_completed_matching("eleventh"));
        assert!(!store.has_completed_matching("twelfth"));
    }

    #[test]
    fn narration_triggered_set() {
        let mut store = InteractionStore::new();
        assert!(!store.is_narration_triggered("Scene04_RechercheDesIndices_part2"));
        store.set_narration_triggered("Scene04_RechercheDesIndices_part2");
        assert!(store.is_narration_triggered("Scene04_RechercheDesIndices_part2"));
    }
}
