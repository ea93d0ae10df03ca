//! Kira-backed playback with a spatial listener.

use crate::AudioBackend;
use anyhow::{anyhow, Result};
use glam::Vec3;
use kira::{
    manager::{backend::DefaultBackend, AudioManager, AudioManagerSettings},
    sound::static_sound::{StaticSoundData, StaticSoundHandle, StaticSoundSettings},
    sound::PlaybackState,
    spatial::{
        emitter::EmitterSettings,
        listener::{ListenerHandle, ListenerSettings},
        scene::{SpatialSceneHandle, SpatialSceneSettings},
    },
    tween::Tween,
};
use std::collections::HashMap;
use std::path::Path;

fn to_mint(v: Vec3) -> mint::Vector3<f32> {
    mint::Vector3 { x: v.x, y: v.y, z: v.z }
}

pub struct KiraBackend {
    manager: AudioManager,
    spatial_scene: SpatialSceneHandle,
    listener: ListenerHandle,
    sounds: HashMap<String, StaticSoundData>,
    active_sounds: Vec<StaticSoundHandle>,
}

impl KiraBackend {
    pub fn new() -> Result<Self> {
        let mut manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())?;
        let mut spatial_scene = manager.add_spatial_scene(SpatialSceneSettings::default())?;
        let listener = spatial_scene.add_listener(
            to_mint(Vec3::ZERO),
            mint::Quaternion {
                v: to_mint(Vec3::ZERO),
                s: 1.0,
            },
            ListenerSettings::default(),
        )?;

        Ok(Self {
            manager,
            spatial_scene,
            listener,
            sounds: HashMap::new(),
            active_sounds: Vec::new(),
        })
    }

    fn sound(&self, name: &str) -> Result<StaticSoundData> {
        self.sounds
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("sound '{}' is not loaded", name))
    }
}

impl AudioBackend for KiraBackend {
    fn load(&mut self, name: &str, path: &Path) -> Result<()> {
        let sound_data = StaticSoundData::from_file(path)?;
        self.sounds.insert(name.to_string(), sound_data);
        Ok(())
    }

    fn play(&mut self, name: &str, volume: f64, looped: bool) -> Result<()> {
        let mut settings = StaticSoundSettings::new().volume(volume);
        if looped {
            settings = settings.loop_region(..);
        }
        let handle = self.manager.play(self.sound(name)?.with_settings(settings))?;
        self.active_sounds.push(handle);
        Ok(())
    }

    fn play_at(&mut self, name: &str, volume: f64, position: Vec3) -> Result<()> {
        let sound_data = self.sound(name)?;
        let emitter = self
            .spatial_scene
            .add_emitter(to_mint(position), EmitterSettings::default())?;
        let settings = StaticSoundSettings::new().volume(volume).output_destination(&emitter);
        let handle = self.manager.play(sound_data.with_settings(settings))?;
        self.active_sounds.push(handle);
        Ok(())
    }

    fn set_master_volume(&mut self, volume: f64) -> Result<()> {
        let _ = self.manager.main_track().set_volume(volume, Tween::default());
        Ok(())
    }

    fn update_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        let right = forward.cross(up).normalize_or_zero();
        if right == Vec3::ZERO {
            return;
        }
        let corrected_up = right.cross(forward).normalize();
        let rotation = glam::Mat3::from_cols(right, corrected_up, -forward.normalize());
        let quat = glam::Quat::from_mat3(&rotation);

        self.listener.set_position(to_mint(position), Tween::default());
        self.listener.set_orientation(
            mint::Quaternion {
                v: mint::Vector3 {
                    x: quat.x,
                    y: quat.y,
                    z: quat.z,
                },
                s: quat.w,
            },
            Tween::default(),
        );
    }

    fn stop_all(&mut self) {
        for handle in &mut self.active_sounds {
            let _ = handle.stop(Tween::default());
        }
        self.active_sounds.clear();
    }

    fn cleanup(&mut self) {
        self.active_sounds.retain(|handle| handle.state() != PlaybackState::Stopped);
    }
}
