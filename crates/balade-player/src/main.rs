//! Balade — scroll-driven forest walk, console scenario player
//!
//! Architecture:
//!   balade-common   — configuration + asset path conventions
//!   balade-scenario — event bus, animations, narration, triggers, director
//!   audio           — rodio playback backend
//!   walkthrough     — simulated visitor driving the walk

mod audio;
mod walkthrough;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use glam::Vec3;
use rand::Rng;
use tracing_subscriber::EnvFilter;

use balade_common::{find_data_dir, AppConfig, AssetPaths};
use balade_scenario::markers::MarkerConfig;
use balade_scenario::narration::CaptionSource;
use balade_scenario::subtitles::{parse_vtt, Cue, SubtitleError};
use balade_scenario::{AudioPlayer, Director, NarrationSequencer, WorldState};

use audio::{NullAudio, SharedAudio, SoundEngine};
use walkthrough::Walkthrough;

/// Tick length for the 30 FPS scenario clock
const TICK: Duration = Duration::from_millis(33);

/// Ambient one-shots played at random intervals during the walk
const AMBIENT_IDS: &[&str] = &["BirdChirp1", "BirdChirp2", "WindLeaves", "Cricket"];

fn main() -> Result<()> {
    let config = load_config()?;

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("balade={}", config.log_level).parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Balade Player v{}", env!("CARGO_PKG_VERSION"));

    let Some(data_dir) = find_data_dir(&config) else {
        anyhow::bail!(
            "Asset data not found!\n\n\
             Place a 'data/' folder (audios/, markers.json) next to balade\n\
             or in the working directory, set BALADE_DATA, or set data_dir\n\
             in balade.toml."
        );
    };
    tracing::info!("Asset data: {}", data_dir.display());

    let paths = AssetPaths::new(data_dir.clone());
    let markers = load_markers(&paths)?;
    let mut world = build_world(markers.as_ref());

    // Narration backend: real audio when a device is available and we are
    // not muted, otherwise the sequencer runs off the caption clock.
    let mut engine = None;
    let audio_backend: Box<dyn AudioPlayer> = if config.audio.muted {
        tracing::info!("Audio muted, captions only");
        Box::new(NullAudio)
    } else {
        match SoundEngine::new(AssetPaths::new(data_dir.clone()), config.audio.master_volume) {
            Some(sound) => {
                let shared = Rc::new(RefCell::new(sound));
                engine = Some(shared.clone());
                Box::new(SharedAudio(shared))
            }
            None => Box::new(NullAudio),
        }
    };

    let captions = FileCaptions {
        paths: AssetPaths::new(data_dir),
    };
    let narration = NarrationSequencer::new(audio_backend, Box::new(captions));

    let mut director = Director::new(narration);
    director.start(&mut world);

    let mut visitor = Walkthrough::new();
    let mut last_subtitle: Option<String> = None;
    let mut ambient_ms: u32 = 5_000;
    let mut last_frame = Instant::now();

    loop {
        std::thread::sleep(TICK);
        let now = Instant::now();
        let dt_ms = now.duration_since(last_frame).as_millis() as u32;
        last_frame = now;

        director.update(dt_ms, &mut world);
        visitor.tick(dt_ms, &mut director, &mut world);

        // Captions to the console, once per cue
        let subtitle = director.narration.current_subtitle();
        if subtitle != last_subtitle {
            if let Some(text) = &subtitle {
                println!("  {}", text);
            }
            last_subtitle = subtitle;
        }

        if let Some(engine) = &engine {
            ambient_ms = ambient_ms.saturating_sub(dt_ms);
            if ambient_ms == 0 {
                let mut rng = rand::thread_rng();
                let id = AMBIENT_IDS[rng.gen_range(0..AMBIENT_IDS.len())];
                engine.borrow_mut().play_bonus(id);
                ambient_ms = rng.gen_range(8_000..20_000);
            }
            engine.borrow_mut().gc();
        }

        if visitor.finished(&director) {
            tracing::info!("Walk complete at {}", director.store.current_step());
            break;
        }
    }

    Ok(())
}

/// Load balade.toml from the working directory or next to the executable,
/// falling back to defaults when absent.
fn load_config() -> Result<AppConfig> {
    let mut candidates = vec![PathBuf::from("balade.toml")];
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("balade.toml"));
        }
    }
    for candidate in candidates {
        if candidate.is_file() {
            return AppConfig::load(&candidate)
                .with_context(|| format!("Failed to load {}", candidate.display()));
        }
    }
    Ok(AppConfig::default())
}

/// Load markers.json when present. A broken file is a startup error worth
/// surfacing, a missing one just means the built-in layout.
fn load_markers(paths: &AssetPaths) -> Result<Option<MarkerConfig>> {
    let path = paths.markers_config();
    if !path.is_file() {
        tracing::warn!("No marker config at {}, using built-in layout", path.display());
        return Ok(None);
    }
    let config = MarkerConfig::load(&path)
        .with_context(|| format!("Invalid marker config at {}", path.display()))?;
    tracing::info!("Loaded {} markers", config.markers.len());
    Ok(Some(config))
}

/// Stand up the forest scene the scenario expects: the interactive objects
/// along the path, plus any positioned markers from the config.
fn build_world(markers: Option<&MarkerConfig>) -> WorldState {
    let mut world = WorldState::new();
    world.add_object("DirectionPanelEndInteractive", Vec3::new(0.0, 0.0, 1.0));
    world.add_object("TrunkLargeInteractive", Vec3::new(0.0, 0.0, 3.0));
    let pile = world.add_object("LeafErable", Vec3::new(0.0, 0.0, 5.0));
    for i in 0..8 {
        let angle = i as f32 * std::f32::consts::TAU / 8.0;
        world.add_child(
            pile,
            &format!("leaf_{i}"),
            Vec3::new(angle.cos() * 0.2, 0.0, 5.0 + angle.sin() * 0.2),
        );
    }
    world.add_object("AnimalPaws", Vec3::new(0.3, 0.0, 5.2));
    for i in 1..=4 {
        world.add_object(&format!("JumpRock{i}"), Vec3::new(0.0, 0.0, 6.0 + i as f32));
    }
    world.add_object("ThinTrunkInteractive", Vec3::new(0.0, 0.0, 11.0));
    world.add_object("Vison", Vec3::new(0.4, 0.0, 12.0));

    if let Some(config) = markers {
        for marker in &config.markers {
            if let Some([x, y, z]) = marker.position {
                world.add_object(&marker.id, Vec3::new(x, y, z));
            }
        }
    }
    world
}

/// Loads .vtt caption files from the asset tree
struct FileCaptions {
    paths: AssetPaths,
}

impl CaptionSource for FileCaptions {
    fn load(&mut self, id: &str) -> Result<Vec<Cue>, SubtitleError> {
        let text = std::fs::read_to_string(self.paths.narration_captions(id))?;
        parse_vtt(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_marker_config_falls_back_to_builtin_layout() {
        let paths = AssetPaths::new(std::env::temp_dir().join("balade-no-markers"));
        assert!(load_markers(&paths).unwrap().is_none());
    }

    #[test]
    fn invalid_marker_config_is_a_startup_error() {
        let dir = std::env::temp_dir().join("balade-bad-markers");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("markers.json"), "{ not json").unwrap();

        let result = load_markers(&AssetPaths::new(dir.clone()));
        std::fs::remove_dir_all(&dir).ok();
        assert!(result.is_err());
    }
}
