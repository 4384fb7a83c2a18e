//! Animation registry and tick-driven runner.
//!
//! Animation names carry their category as the prefix before the first `-`
//! (`jump-animation` → `jump`, `timeline-advance` → `timeline`). The
//! `timeline` and `jump` categories are mutually exclusive: both move the
//! visitor along the path, so starting one while the other runs is refused.
//! Starting an animation while another of the same exclusive category runs
//! cancels the running one first.
//!
//! Effects compute every frame from the state captured at start, so the
//! final frame lands exactly on the target state with no drift.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::Vec3;

use crate::event::ScenarioEvent;
use crate::interaction::InteractionStore;
use crate::stage::{ObjectHandle, Stage};

/// Categories that cannot run at the same time
pub const EXCLUSIVE_CATEGORIES: [&str; 2] = ["timeline", "jump"];

/// The category of an animation name: everything before the first `-`
pub fn category(name: &str) -> &str {
    name.split('-').next().unwrap_or(name)
}

fn in_exclusive_group(cat: &str) -> bool {
    EXCLUSIVE_CATEGORIES.contains(&cat)
}

/// Default easing: ease-in-out cubic
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Camera-flash envelope: full intensity reached in the first 20% of the
/// animation, then a linear decay over the remaining 80%.
pub fn flash_envelope(t: f32) -> f32 {
    if t < 0.2 {
        t / 0.2
    } else {
        1.0 - (t - 0.2) / 0.8
    }
}

/// Per-start tuning of an animation
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationParams {
    /// Override the registered default duration (seconds)
    pub duration: Option<f32>,
    /// Peak height of jump parabolas
    pub height: f32,
    /// Radius leaf-scatter pushes children outward
    pub spread: f32,
    /// How far the camera dips while ducking
    pub depth: f32,
    /// Peak flash intensity
    pub intensity: f32,
    /// Horizontal travel applied over the animation (jumps)
    pub offset: Vec3,
    /// Camera destination for camera-zoom
    pub target_position: Option<Vec3>,
    /// Timeline destination for timeline-advance
    pub target_timeline: Option<f32>,
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            duration: None,
            height: 1.0,
            spread: 1.0,
            depth: 0.5,
            intensity: 1.0,
            offset: Vec3::ZERO,
            target_position: None,
            target_timeline: None,
        }
    }
}

/// The built-in effect behaviors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Vertical parabola on the target object, with optional travel
    Jump,
    /// Jump variant used on the river rocks
    RiverJump,
    /// Camera dips under an obstacle and comes back up
    Duck,
    /// Push the target's children outward to reveal what is underneath
    LeafScatter,
    /// Ease the camera toward a destination
    CameraZoom,
    /// Full-screen photo flash
    CameraFlash,
    /// Move the scroll timeline to a destination (linear)
    TimelineAdvance,
}

/// A registered animation
#[derive(Debug, Clone)]
pub struct AnimationSpec {
    pub name: String,
    pub effect: Effect,
    /// Seconds
    pub default_duration: f32,
    /// Lock scrolling while this animation runs
    pub disables_scroll: bool,
}

/// Name → spec registry
pub struct AnimationRegistry {
    specs: HashMap<String, AnimationSpec>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self {
            specs: HashMap::new(),
        }
    }

    /// The built-in animation set
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            ("jump-animation", Effect::Jump, 1.0, true),
            ("river-jump", Effect::RiverJump, 0.8, true),
            ("duck-animation", Effect::Duck, 1.0, true),
            ("leaf-scatter", Effect::LeafScatter, 1.2, false),
            ("camera-zoom", Effect::CameraZoom, 2.0, false),
            ("camera-flash", Effect::CameraFlash, 1.0, false),
            ("timeline-advance", Effect::TimelineAdvance, 2.0, true),
        ];
        for (name, effect, duration, locks) in defaults {
            registry.register(AnimationSpec {
                name: name.to_string(),
                effect,
                default_duration: duration,
                disables_scroll: locks,
            });
        }
        registry
    }

    /// Register an animation. Re-registering a name overwrites it.
    pub fn register(&mut self, spec: AnimationSpec) {
        if self.specs.contains_key(&spec.name) {
            tracing::warn!("Animation '{}' re-registered, overwriting", spec.name);
        }
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&AnimationSpec> {
        self.specs.get(name)
    }
}

impl Default for AnimationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Result of asking the runner to start an animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Started { id: String },
    /// An exclusive animation of another category is running
    Refused { running: String },
    UnknownAnimation,
}

/// State captured when an animation starts, used to compute each frame
enum Origin {
    Object { position: Vec3 },
    Children { positions: Vec<(ObjectHandle, Vec3)> },
    Camera { position: Vec3 },
    Timeline { from: f32, to: f32 },
    Flash,
    Detached,
}

struct ActiveAnimation {
    id: String,
    name: String,
    category: String,
    target_key: Option<String>,
    target: Option<ObjectHandle>,
    effect: Effect,
    params: AnimationParams,
    duration_ms: f32,
    elapsed_ms: f32,
    origin: Origin,
    disabled_scroll: bool,
}

/// Runs active animation instances against the stage
pub struct AnimationRunner {
    registry: AnimationRegistry,
    active: Vec<ActiveAnimation>,
    pending: Vec<ScenarioEvent>,
}

impl AnimationRunner {
    pub fn new(registry: AnimationRegistry) -> Self {
        Self {
            registry,
            active: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn registry_mut(&mut self) -> &mut AnimationRegistry {
        &mut self.registry
    }

    /// Ask to start an animation. Exclusive-category conflicts refuse;
    /// a running animation of the same exclusive category is replaced.
    pub fn start(
        &mut self,
        name: &str,
        target_key: Option<&str>,
        params: AnimationParams,
        stage: &mut dyn Stage,
        store: &mut InteractionStore,
    ) -> RequestOutcome {
        let Some(spec) = self.registry.get(name).cloned() else {
            tracing::warn!("Unknown animation '{}'", name);
            return RequestOutcome::UnknownAnimation;
        };

        let cat = category(name).to_string();
        if in_exclusive_group(&cat) {
            if let Some(running) = self
                .active
                .iter()
                .find(|a| in_exclusive_group(&a.category))
                .map(|a| (a.id.clone(), a.category.clone(), a.name.clone()))
            {
                let (running_id, running_cat, running_name) = running;
                if running_cat != cat {
                    tracing::warn!(
                        "Refusing '{}': exclusive animation '{}' is running",
                        name,
                        running_name
                    );
                    return RequestOutcome::Refused {
                        running: running_name,
                    };
                }
                tracing::debug!("Replacing running '{}' with '{}'", running_name, name);
                self.cancel(&running_id, store);
            }
        }

        let target = match target_key {
            Some(key) => {
                let found = stage.find_object(key);
                if found.is_none() {
                    tracing::debug!(
                        "Animation '{}': no scene object for '{}', running detached",
                        name,
                        key
                    );
                }
                found
            }
            None => None,
        };

        let origin = match spec.effect {
            Effect::Jump | Effect::RiverJump => match target {
                Some(h) => Origin::Object {
                    position: stage.position(h),
                },
                None => Origin::Detached,
            },
            Effect::LeafScatter => match target {
                Some(h) => Origin::Children {
                    positions: stage
                        .children(h)
                        .into_iter()
                        .map(|c| (c, stage.position(c)))
                        .collect(),
                },
                None => Origin::Detached,
            },
            Effect::Duck | Effect::CameraZoom => Origin::Camera {
                position: stage.camera_position(),
            },
            Effect::CameraFlash => Origin::Flash,
            Effect::TimelineAdvance => {
                let from = stage.timeline_position();
                Origin::Timeline {
                    from,
                    to: params.target_timeline.unwrap_or(from),
                }
            }
        };

        let duration_ms = params.duration.unwrap_or(spec.default_duration) * 1000.0;
        let id = format!(
            "{}-{}-{}",
            name,
            target_key.unwrap_or("global"),
            now_ms()
        );

        let disabled_scroll = spec.disables_scroll && store.allow_scroll();
        if spec.disables_scroll {
            store.set_allow_scroll(false);
        }

        tracing::info!("Starting animation '{}' ({})", name, id);
        self.pending.push(ScenarioEvent::AnimationStart {
            name: name.to_string(),
            target: target_key.map(str::to_string),
            id: id.clone(),
        });
        self.active.push(ActiveAnimation {
            id: id.clone(),
            name: name.to_string(),
            category: cat,
            target_key: target_key.map(str::to_string),
            target,
            effect: spec.effect,
            params,
            duration_ms,
            elapsed_ms: 0.0,
            origin,
            disabled_scroll,
        });
        RequestOutcome::Started { id }
    }

    /// Cancel an instance by id. Idempotent; restores scrolling when the
    /// canceled animation had locked it.
    pub fn cancel(&mut self, id: &str, store: &mut InteractionStore) -> bool {
        let Some(pos) = self.active.iter().position(|a| a.id == id) else {
            return false;
        };
        let anim = self.active.remove(pos);
        if anim.disabled_scroll {
            store.set_allow_scroll(true);
        }
        tracing::debug!("Canceled animation '{}' ({})", anim.name, anim.id);
        true
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.active.iter().any(|a| a.name == name)
    }

    pub fn running_in_category(&self, cat: &str) -> Option<&str> {
        self.active
            .iter()
            .find(|a| a.category == cat)
            .map(|a| a.name.as_str())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Advance all running instances. Returns the events produced this tick.
    pub fn update(
        &mut self,
        dt_ms: f32,
        stage: &mut dyn Stage,
        store: &mut InteractionStore,
    ) -> Vec<ScenarioEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let mut finished = Vec::new();

        for anim in &mut self.active {
            anim.elapsed_ms += dt_ms;
            let done = anim.elapsed_ms >= anim.duration_ms;
            let t = if done {
                1.0
            } else {
                (anim.elapsed_ms / anim.duration_ms).clamp(0.0, 1.0)
            };
            apply_effect(anim, t, stage);
            if done {
                finished.push(anim.id.clone());
            }
        }

        for id in finished {
            let Some(pos) = self.active.iter().position(|a| a.id == id) else {
                continue;
            };
            let anim = self.active.remove(pos);
            tracing::info!("Animation '{}' complete ({})", anim.name, anim.id);
            events.push(ScenarioEvent::AnimationComplete {
                name: anim.name.clone(),
                target: anim.target_key.clone(),
                id: anim.id.clone(),
            });
            if anim.effect == Effect::TimelineAdvance {
                if let Origin::Timeline { to, .. } = anim.origin {
                    events.push(ScenarioEvent::DistanceTransitionComplete {
                        final_position: to,
                    });
                }
                events.push(ScenarioEvent::ChapterTransitionComplete);
                if anim.disabled_scroll {
                    store.set_allow_scroll(true);
                }
            }
        }
        events
    }
}

/// Write the state of one instance at progress `t` (1.0 = exact final state)
fn apply_effect(anim: &ActiveAnimation, t: f32, stage: &mut dyn Stage) {
    match (&anim.effect, &anim.origin) {
        (Effect::Jump | Effect::RiverJump, Origin::Object { position }) => {
            let Some(handle) = anim.target else { return };
            if t >= 1.0 {
                stage.set_position(handle, *position + anim.params.offset);
                return;
            }
            let travel = *position + anim.params.offset * ease_in_out_cubic(t);
            let y = position.y + (PI * t).sin() * anim.params.height;
            stage.set_position(handle, Vec3::new(travel.x, y, travel.z));
        }
        (Effect::LeafScatter, Origin::Children { positions }) => {
            let eased = if t >= 1.0 { 1.0 } else { ease_in_out_cubic(t) };
            for (i, (child, origin)) in positions.iter().enumerate() {
                let angle = i as f32 * 2.399_963; // golden angle, even spread
                let dir = Vec3::new(angle.cos(), 0.0, angle.sin());
                stage.set_position(*child, *origin + dir * anim.params.spread * eased);
            }
        }
        (Effect::Duck, Origin::Camera { position }) => {
            if t >= 1.0 {
                stage.set_camera_position(*position);
                return;
            }
            let mut pos = *position;
            pos.y -= (PI * t).sin() * anim.params.depth;
            stage.set_camera_position(pos);
        }
        (Effect::CameraZoom, Origin::Camera { position }) => {
            let target = anim.params.target_position.unwrap_or(*position);
            if t >= 1.0 {
                stage.set_camera_position(target);
                return;
            }
            stage.set_camera_position(position.lerp(target, ease_in_out_cubic(t)));
        }
        (Effect::CameraFlash, Origin::Flash) => {
            let value = if t >= 1.0 {
                0.0
            } else {
                anim.params.intensity * flash_envelope(t)
            };
            stage.set_flash_intensity(value);
        }
        (Effect::TimelineAdvance, Origin::Timeline { from, to }) => {
            // Linear on purpose — the scroll transition does not ease
            let value = if t >= 1.0 { *to } else { from + (to - from) * t };
            stage.set_timeline_position(value);
        }
        // Detached instances keep their timing but touch nothing
        _ => {}
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
