//! Audio command surface.
//!
//! [`AudioManager`] is what scripts and the runtime talk to. It forwards to an
//! [`AudioBackend`]; playback failures are logged and reported as `false`, never raised.

use anyhow::{anyhow, Result};
use glam::Vec3;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[cfg(feature = "kira")]
mod kira_backend;
#[cfg(feature = "kira")]
pub use kira_backend::KiraBackend;

/// Something that can actually produce sound.
pub trait AudioBackend {
    /// Register a sound under `name`.
    fn load(&mut self, name: &str, path: &Path) -> Result<()>;
    /// Start playing a registered sound at `volume` (already scaled by the master volume).
    fn play(&mut self, name: &str, volume: f64, looped: bool) -> Result<()>;
    /// Play a registered sound from a world position.
    fn play_at(&mut self, name: &str, volume: f64, _position: Vec3) -> Result<()> {
        self.play(name, volume, false)
    }
    fn set_master_volume(&mut self, volume: f64) -> Result<()>;
    /// Move the listener (call each frame with the active camera).
    fn update_listener(&mut self, _position: Vec3, _forward: Vec3, _up: Vec3) {}
    fn stop_all(&mut self);
    /// Drop finished voices.
    fn cleanup(&mut self) {}
}

/// Backend that plays nothing but keeps track of what was asked of it.
#[derive(Debug, Default)]
pub struct NullBackend {
    sounds: HashMap<String, PathBuf>,
    played: Vec<String>,
    master_volume: f64,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names passed to successful `play` calls, oldest first.
    pub fn played(&self) -> &[String] {
        &self.played
    }
}

impl AudioBackend for NullBackend {
    fn load(&mut self, name: &str, path: &Path) -> Result<()> {
        self.sounds.insert(name.to_string(), path.to_path_buf());
        Ok(())
    }

    fn play(&mut self, name: &str, _volume: f64, _looped: bool) -> Result<()> {
        if !self.sounds.contains_key(name) {
            return Err(anyhow!("sound '{}' is not loaded", name));
        }
        self.played.push(name.to_string());
        Ok(())
    }

    fn set_master_volume(&mut self, volume: f64) -> Result<()> {
        self.master_volume = volume;
        Ok(())
    }

    fn stop_all(&mut self) {}
}

#[cfg(feature = "kira")]
fn default_backend() -> Box<dyn AudioBackend> {
    match KiraBackend::new() {
        Ok(backend) => Box::new(backend),
        Err(err) => {
            log::warn!("Audio device unavailable, running silent: {}", err);
            Box::new(NullBackend::new())
        }
    }
}

#[cfg(not(feature = "kira"))]
fn default_backend() -> Box<dyn AudioBackend> {
    Box::new(NullBackend::new())
}

/// Manages playback requests and the master volume.
pub struct AudioManager {
    backend: Box<dyn AudioBackend>,
    master_volume: f64,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new(Box::new(NullBackend::new()))
    }
}

impl AudioManager {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        let mut manager = Self {
            backend,
            master_volume: 0.5,
        };
        manager.set_master_volume(0.5);
        log::info!("AudioManager initialized. Master volume: {:.2}", manager.master_volume);
        manager
    }

    /// The real backend when the `kira` feature is enabled and a device opens,
    /// otherwise the silent one.
    pub fn with_default_backend() -> Self {
        Self::new(default_backend())
    }

    pub fn load_sound(&mut self, name: &str, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.backend.load(name, path) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Failed to load sound '{}' from {}: {}", name, path.display(), err);
                false
            }
        }
    }

    /// Play a sound at `volume` relative to the master volume.
    pub fn play_sound(&mut self, name: &str, volume: f64) -> bool {
        let volume = self.master_volume * volume.clamp(0.0, 1.0);
        self.report(name, |backend| backend.play(name, volume, false))
    }

    /// Play a sound that repeats until [`AudioManager::stop_all`].
    pub fn play_looped(&mut self, name: &str, volume: f64) -> bool {
        let volume = self.master_volume * volume.clamp(0.0, 1.0);
        self.report(name, |backend| backend.play(name, volume, true))
    }

    pub fn play_sound_at(&mut self, name: &str, volume: f64, position: Vec3) -> bool {
        let volume = self.master_volume * volume.clamp(0.0, 1.0);
        self.report(name, |backend| backend.play_at(name, volume, position))
    }

    fn report(&mut self, name: &str, play: impl FnOnce(&mut dyn AudioBackend) -> Result<()>) -> bool {
        match play(self.backend.as_mut()) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not play sound '{}': {}", name, err);
                false
            }
        }
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    /// Set the master volume, clamped to [0, 1].
    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        if let Err(err) = self.backend.set_master_volume(self.master_volume) {
            log::warn!("Could not set master volume: {}", err);
        }
    }

    pub fn update_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        self.backend.update_listener(position, forward, up);
    }

    pub fn stop_all(&mut self) {
        self.backend.stop_all();
    }

    /// Per-frame housekeeping.
    pub fn cleanup(&mut self) {
        self.backend.cleanup();
    }
}
