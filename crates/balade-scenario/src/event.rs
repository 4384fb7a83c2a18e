//! Typed event bus for the scenario systems.
//!
//! Events are a closed enum rather than stringly-typed payloads; the string
//! names (`"marker:click"`, `"narration-ended"`, …) survive as [`EventKind`]
//! names so external integrations can subscribe by name. Dispatch is
//! synchronous and in subscription order. Events triggered before
//! [`EventBus::mark_ready`] are queued and replayed in order once the bus
//! becomes ready, so early triggers are not lost during startup.

use std::collections::{HashMap, VecDeque};

use crate::animation::AnimationParams;

/// Discriminant for [`ScenarioEvent`], used as the subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MarkerClick,
    MarkerHover,
    InteractionDetected,
    InteractionComplete,
    InterfaceAction,
    AnimationTrigger,
    AnimationStart,
    AnimationComplete,
    NarrationStarted,
    NarrationEnded,
    DistanceTransitionComplete,
    ChapterTransitionComplete,
    ScenarioInitialized,
}

impl EventKind {
    /// The wire/legacy name of this event kind
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::MarkerClick => "marker:click",
            EventKind::MarkerHover => "marker:hover",
            EventKind::InteractionDetected => "interaction:detected",
            EventKind::InteractionComplete => "marker:interaction:complete",
            EventKind::InterfaceAction => "interface-action",
            EventKind::AnimationTrigger => "animation:trigger",
            EventKind::AnimationStart => "animation:start",
            EventKind::AnimationComplete => "animation:complete",
            EventKind::NarrationStarted => "narration-started",
            EventKind::NarrationEnded => "narration-ended",
            EventKind::DistanceTransitionComplete => "distance-transition-complete",
            EventKind::ChapterTransitionComplete => "chapter-transition-complete",
            EventKind::ScenarioInitialized => "scenario:initialized",
        }
    }

    /// Look up a kind by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "marker:click" => EventKind::MarkerClick,
            "marker:hover" => EventKind::MarkerHover,
            "interaction:detected" => EventKind::InteractionDetected,
            "marker:interaction:complete" => EventKind::InteractionComplete,
            "interface-action" => EventKind::InterfaceAction,
            "animation:trigger" => EventKind::AnimationTrigger,
            "animation:start" => EventKind::AnimationStart,
            "animation:complete" => EventKind::AnimationComplete,
            "narration-started" => EventKind::NarrationStarted,
            "narration-ended" => EventKind::NarrationEnded,
            "distance-transition-complete" => EventKind::DistanceTransitionComplete,
            "chapter-transition-complete" => EventKind::ChapterTransitionComplete,
            "scenario:initialized" => EventKind::ScenarioInitialized,
            _ => return None,
        };
        Some(kind)
    }
}

/// Identification payload carried by marker and interaction events.
/// Any subset of the fields may be present; the trigger resolver works
/// through them in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerPayload {
    pub id: Option<String>,
    pub marker_id: Option<String>,
    pub object_key: Option<String>,
    pub required_step: Option<String>,
}

impl TriggerPayload {
    pub fn with_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_object_key(key: &str) -> Self {
        Self {
            object_key: Some(key.to_string()),
            ..Self::default()
        }
    }
}

/// All events flowing between the scenario systems
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioEvent {
    MarkerClick(TriggerPayload),
    MarkerHover(TriggerPayload),
    InteractionDetected(TriggerPayload),
    InteractionComplete(TriggerPayload),
    InterfaceAction {
        interface: String,
        action: String,
        result: Option<String>,
    },
    AnimationTrigger {
        name: String,
        target: Option<String>,
        params: AnimationParams,
    },
    AnimationStart {
        name: String,
        target: Option<String>,
        id: String,
    },
    AnimationComplete {
        name: String,
        target: Option<String>,
        id: String,
    },
    NarrationStarted {
        id: String,
    },
    NarrationEnded {
        id: String,
    },
    DistanceTransitionComplete {
        final_position: f32,
    },
    ChapterTransitionComplete,
    ScenarioInitialized,
}

impl ScenarioEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ScenarioEvent::MarkerClick(_) => EventKind::MarkerClick,
            ScenarioEvent::MarkerHover(_) => EventKind::MarkerHover,
            ScenarioEvent::InteractionDetected(_) => EventKind::InteractionDetected,
            ScenarioEvent::InteractionComplete(_) => EventKind::InteractionComplete,
            ScenarioEvent::InterfaceAction { .. } => EventKind::InterfaceAction,
            ScenarioEvent::AnimationTrigger { .. } => EventKind::AnimationTrigger,
            ScenarioEvent::AnimationStart { .. } => EventKind::AnimationStart,
            ScenarioEvent::AnimationComplete { .. } => EventKind::AnimationComplete,
            ScenarioEvent::NarrationStarted { .. } => EventKind::NarrationStarted,
            ScenarioEvent::NarrationEnded { .. } => EventKind::NarrationEnded,
            ScenarioEvent::DistanceTransitionComplete { .. } => {
                EventKind::DistanceTransitionComplete
            }
            ScenarioEvent::ChapterTransitionComplete => EventKind::ChapterTransitionComplete,
            ScenarioEvent::ScenarioInitialized => EventKind::ScenarioInitialized,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

struct Subscriber {
    id: ListenerId,
    callback: Box<dyn FnMut(&ScenarioEvent)>,
}

/// Synchronous pub/sub bus for scenario events
pub struct EventBus {
    listeners: HashMap<EventKind, Vec<Subscriber>>,
    next_id: u64,
    ready: bool,
    pending: VecDeque<ScenarioEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 1,
            ready: false,
            pending: VecDeque::new(),
        }
    }

    /// Subscribe to an event kind. Listeners fire in subscription order.
    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> ListenerId
    where
        F: FnMut(&ScenarioEvent) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(kind).or_default().push(Subscriber {
            id,
            callback: Box::new(callback),
        });
        id
    }

    /// Subscribe by wire name. Unknown names log a warning and subscribe
    /// nothing.
    pub fn on_named<F>(&mut self, name: &str, callback: F) -> Option<ListenerId>
    where
        F: FnMut(&ScenarioEvent) + 'static,
    {
        match EventKind::from_name(name) {
            Some(kind) => Some(self.on(kind, callback)),
            None => {
                tracing::warn!("EventBus: unknown event name '{}'", name);
                None
            }
        }
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn off(&mut self, id: ListenerId) -> bool {
        for subs in self.listeners.values_mut() {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                subs.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Mark the bus ready and replay every queued event in trigger order.
    pub fn mark_ready(&mut self) {
        self.ready = true;
        let queued: Vec<ScenarioEvent> = self.pending.drain(..).collect();
        if !queued.is_empty() {
            tracing::debug!("EventBus: replaying {} queued events", queued.len());
        }
        for event in queued {
            self.dispatch(&event);
        }
    }

    /// Publish an event. Queued until [`mark_ready`](Self::mark_ready) has
    /// been called, dispatched synchronously afterwards.
    pub fn trigger(&mut self, event: ScenarioEvent) {
        if !self.ready {
            self.pending.push_back(event);
            return;
        }
        self.dispatch(&event);
    }

    fn dispatch(&mut self, event: &ScenarioEvent) {
        if let Some(subs) = self.listeners.get_mut(&event.kind()) {
            for sub in subs.iter_mut() {
                (sub.callback)(event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn dispatches_in_subscription_order() {
        let mut bus = EventBus::new();
        bus.mark_ready();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        bus.on(EventKind::NarrationEnded, move |_| l1.borrow_mut().push("first"));
        let l2 = log.clone();
        bus.on(EventKind::NarrationEnded, move |_| l2.borrow_mut().push("second"));

        bus.trigger(ScenarioEvent::NarrationEnded {
            id: "Radio1".into(),
        });
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn queues_until_ready_then_replays_in_order() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        bus.on(EventKind::NarrationEnded, move |ev| {
            if let ScenarioEvent::NarrationEnded { id } = ev {
                l.borrow_mut().push(id.clone());
            }
        });

        bus.trigger(ScenarioEvent::NarrationEnded { id: "a".into() });
        bus.trigger(ScenarioEvent::NarrationEnded { id: "b".into() });
        assert!(log.borrow().is_empty());

        bus.mark_ready();
        assert_eq!(*log.borrow(), vec!["a".to_string(), "b".to_string()]);

        // Once ready, dispatch is immediate
        bus.trigger(ScenarioEvent::NarrationEnded { id: "c".into() });
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn off_stops_delivery() {
        let mut bus = EventBus::new();
        bus.mark_ready();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let id = bus.on(EventKind::ChapterTransitionComplete, move |_| {
            *c.borrow_mut() += 1
        });

        bus.trigger(ScenarioEvent::ChapterTransitionComplete);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.trigger(ScenarioEvent::ChapterTransitionComplete);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn unknown_event_name_subscribes_nothing() {
        let mut bus = EventBus::new();
        assert!(bus.on_named("no:such:event", |_| {}).is_none());
        assert!(bus.on_named("narration-ended", |_| {}).is_some());
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            EventKind::MarkerClick,
            EventKind::InteractionDetected,
            EventKind::AnimationComplete,
            EventKind::NarrationEnded,
            EventKind::DistanceTransitionComplete,
        ] {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
    }
}
