//! Game settings and tuning
//!
//! Persisted in LocalStorage; missing fields fall back to defaults so old
//! saved settings keep loading after new knobs are added.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_FRAME_MS;

/// Movement constants shared by every body
///
/// Horizontal speeds are in tiles per frame unit, vertical values in pixels
/// per frame unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub gravity: f32,
    /// Top walking speed
    pub max_run: f32,
    /// Top speed while the run intent is held
    pub max_sprint: f32,
    /// Horizontal velocity multiplier per tick without input
    pub friction: f32,
    /// Below this |vx| friction snaps velocity to zero
    pub stop_threshold: f32,
    /// Vertical velocity applied on jump (negative = up)
    pub jump_velocity: f32,
    /// Horizontal acceleration per frame unit
    pub run_accel: f32,
    /// Acceleration multiplier while running
    pub run_boost: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: 0.5,
            max_run: 1.8,
            max_sprint: 2.6,
            friction: 0.85,
            stop_threshold: 0.05,
            jump_velocity: -8.0,
            run_accel: 0.2,
            run_boost: 1.3,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Movement tuning
    pub physics: PhysicsTuning,
    /// Upper bound on real time fed into one tick (ms)
    pub max_frame_ms: f32,
    /// Show FPS counter in the HUD
    pub show_fps: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            physics: PhysicsTuning::default(),
            max_frame_ms: MAX_FRAME_MS,
            show_fps: false,
        }
    }
}

impl Settings {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "retro_platformer_settings";

    /// Parse settings JSON, filling gaps with defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Clamp values that would break the integrator
    fn sanitize(&mut self) {
        if !(self.max_frame_ms > 0.0 && self.max_frame_ms <= MAX_FRAME_MS * 2.0) {
            log::warn!(
                "max_frame_ms {} out of range, using {}",
                self.max_frame_ms,
                MAX_FRAME_MS
            );
            self.max_frame_ms = MAX_FRAME_MS;
        }
        self.physics.friction = self.physics.friction.clamp(0.0, 0.99);
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
