//! The engine root. One instance per process, passed by reference to the frame.

use crate::{CameraManager, EngineConfig, EngineError};
use ai::{AiStats, BehaviorTreeManager};
use audio::AudioManager;
use engine_core::{Component, ComponentKind, ObjectId, PropertyValue, Time};
use input::InputState;
use network::{LoopbackTransport, NetworkManager};
use physics::PhysicsSystem;
use scene::{SceneError, SceneGraph, SceneObject};
use scripting::{GlobalStore, ScriptConfig, ScriptEngine, ScriptServices, ScriptStats, SharedScene};
use std::cell::{Ref, RefCell, RefMut};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

/// Editor mode allows pausing the simulation; standalone always runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Editor,
    Standalone,
}

/// What the last frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub dt: f32,
    /// Stages 3 to 5 were skipped because the editor paused the game.
    pub paused: bool,
    pub scripts: ScriptStats,
    pub ai: AiStats,
    pub contacts: usize,
    pub render_items: usize,
}

pub struct EngineState {
    pub config: EngineConfig,
    pub(crate) scene: SharedScene,
    pub(crate) services: ScriptServices,
    pub scripts: ScriptEngine,
    pub physics: PhysicsSystem,
    pub behavior: BehaviorTreeManager,
    pub camera: CameraManager,
    pub time: Time,
    mode: EngineMode,
    paused: bool,
    stop_requested: bool,
    pub last_stats: FrameStats,
}

impl EngineState {
    /// Build every manager from `config` around an empty scene.
    ///
    /// An invalid config is fatal.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let mut time = Time::new();
        time.set_max_delta(Duration::from_secs_f32(config.max_frame_dt));

        let mut audio = AudioManager::with_default_backend();
        audio.set_master_volume(config.master_volume);
        let network = NetworkManager::new(
            Box::new(LoopbackTransport::default()),
            &config.network_host,
            config.network_port,
        );

        let mut behavior = BehaviorTreeManager::new();
        if config.behavior_dir.is_dir() {
            match behavior.load_tree_dir(&config.behavior_dir) {
                Ok(count) => log::info!("Loaded {} behavior trees from {:?}", count, config.behavior_dir),
                Err(err) => log::warn!("Failed to read behavior trees from {:?}: {}", config.behavior_dir, err),
            }
        }

        let scripts = ScriptEngine::new(ScriptConfig {
            root: config.script_root.clone(),
            max_operations: config.script_max_operations,
        });

        let mode = if config.editor_mode {
            EngineMode::Editor
        } else {
            EngineMode::Standalone
        };
        log::info!("Engine started in {:?} mode", mode);

        Ok(Self {
            physics: PhysicsSystem::new(config.gravity),
            camera: CameraManager::new(config.viewport_width, config.viewport_height),
            scene: Rc::new(RefCell::new(SceneGraph::new("Untitled"))),
            services: ScriptServices::new(audio, network),
            scripts,
            behavior,
            time,
            mode,
            paused: false,
            stop_requested: false,
            last_stats: FrameStats::default(),
            config,
        })
    }

    pub fn scene(&self) -> Ref<'_, SceneGraph> {
        self.scene.borrow()
    }

    /// Mutable scene access. Do not hold it across [`crate::frame`].
    pub fn scene_mut(&self) -> RefMut<'_, SceneGraph> {
        self.scene.borrow_mut()
    }

    pub fn shared_scene(&self) -> &SharedScene {
        &self.scene
    }

    pub fn services(&self) -> &ScriptServices {
        &self.services
    }

    pub fn input(&self) -> Ref<'_, InputState> {
        self.services.input.borrow()
    }

    pub fn audio(&self) -> RefMut<'_, AudioManager> {
        self.services.audio.borrow_mut()
    }

    pub fn network(&self) -> RefMut<'_, NetworkManager> {
        self.services.network.borrow_mut()
    }

    pub fn store(&self) -> RefMut<'_, GlobalStore> {
        self.services.store.borrow_mut()
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn is_editor_mode(&self) -> bool {
        self.mode == EngineMode::Editor
    }

    /// True when the editor has paused the game simulation.
    pub fn is_game_paused(&self) -> bool {
        self.is_editor_mode() && self.paused
    }

    /// Pause or resume the simulation. Ignored outside editor mode.
    pub fn set_paused(&mut self, paused: bool) {
        if !self.is_editor_mode() {
            log::warn!("Pause requested in standalone mode, ignoring");
            return;
        }
        if self.paused != paused {
            log::info!("Game {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Ask the loop to stop after the current frame.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn create_object(&mut self, name: impl Into<String>, is_3d: bool) -> ObjectId {
        self.scene.borrow_mut().create_object(name, is_3d)
    }

    /// Destroy an object and everything the managers keep for it.
    ///
    /// Script `cleanup` runs first, while the object is still live.
    pub fn destroy_object(&mut self, id: ObjectId) -> Result<SceneObject, SceneError> {
        if !self.scene.borrow().contains(id) {
            return Err(SceneError::UnknownObject(id));
        }
        self.scripts.unbind_object(id, &self.scene, &self.services);
        self.camera.forget_object(&mut self.scene.borrow_mut(), id);
        let object = self.scene.borrow_mut().destroy_object(id)?;
        self.behavior.remove_object(id);
        Ok(object)
    }

    pub fn find(&self, name_or_id: &str) -> Option<ObjectId> {
        self.scene.borrow().find(name_or_id)
    }

    pub fn all_objects(&self) -> Vec<ObjectId> {
        self.scene.borrow().object_ids()
    }

    pub fn add_component<I>(&mut self, id: ObjectId, kind: &ComponentKind, properties: I) -> Result<(), SceneError>
    where
        I: IntoIterator<Item = (String, PropertyValue)>,
    {
        self.scene.borrow_mut().require_mut(id)?.add_component(kind, properties)?;
        Ok(())
    }

    /// Remove the first component of `kind` and release what managers held for it.
    pub fn remove_component(&mut self, id: ObjectId, kind: &ComponentKind) -> Result<Option<Component>, SceneError> {
        let removed = self.scene.borrow_mut().require_mut(id)?.remove_component(kind);
        if removed.is_none() {
            return Ok(None);
        }
        match kind {
            // the first Script component is the one removed
            ComponentKind::Script => self.scripts.remove_slot(id, 0, &self.scene, &self.services),
            ComponentKind::BehaviorTree => {
                let has_tree = self
                    .scene
                    .borrow()
                    .get(id)
                    .is_some_and(|o| o.has_component(&ComponentKind::BehaviorTree));
                if !has_tree {
                    self.behavior.remove_object(id);
                }
            }
            _ => {}
        }
        Ok(removed)
    }

    /// Write one property of the first component of `kind`.
    pub fn set_property(
        &mut self,
        id: ObjectId,
        kind: &ComponentKind,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<(), SceneError> {
        let mut scene = self.scene.borrow_mut();
        let component = scene
            .require_mut(id)?
            .get_component_mut(kind)
            .ok_or_else(|| engine_core::ComponentError::Missing {
                kind: kind.name().to_string(),
            })?;
        component.set_property(name, value.into())?;
        drop(scene);
        if *kind == ComponentKind::Script && name == "file" {
            self.scripts.sync_object(id, &self.scene, &self.services);
        }
        Ok(())
    }

    /// Replace the active scene with a file. A malformed file is fatal.
    pub fn load_scene(&mut self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let path = path.as_ref();
        let graph = SceneGraph::load(path).map_err(|err| match err {
            SceneError::Corrupt(_) | SceneError::Parse(_) | SceneError::DuplicateId(_) => {
                EngineError::Fatal(format!("scene {}: {}", path.display(), err))
            }
            other => EngineError::Scene(other),
        })?;
        self.replace_scene(graph);
        Ok(())
    }

    /// Save the active scene, including behavior-tree blackboards.
    pub fn save_scene(&mut self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        self.behavior.export_state(&mut self.scene.borrow_mut());
        self.scene.borrow().save(path.as_ref())?;
        log::info!("Saved scene to {}", path.as_ref().display());
        Ok(())
    }

    pub fn new_scene(&mut self, name: impl Into<String>) {
        self.replace_scene(SceneGraph::new(name));
    }

    /// Swap in another scene. Bindings of the old one are cleaned up first and ids keep
    /// counting from where the old scene stopped.
    pub fn replace_scene(&mut self, mut graph: SceneGraph) {
        self.scripts.unbind_all(&self.scene, &self.services);
        self.behavior.clear();
        self.camera.reset();
        self.physics.reset();
        graph.continue_ids_from(self.scene.borrow().peek_next_id());
        log::info!("Scene '{}' active with {} objects", graph.name, graph.len());
        *self.scene.borrow_mut() = graph;
        self.camera.pick_default(&mut self.scene.borrow_mut());
    }

    /// Tear everything down. The state is unusable afterwards.
    pub fn shutdown(&mut self) {
        self.scripts.unbind_all(&self.scene, &self.services);
        self.behavior.clear();
        self.network().stop();
        {
            let mut audio = self.audio();
            audio.stop_all();
            audio.cleanup();
        }
        self.scene.borrow_mut().clear();
        log::info!("Engine shut down after {} frames", self.time.frame_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scripting::BindingState;

    fn engine() -> EngineState {
        EngineState::new(EngineConfig::default()).unwrap()
    }

    fn script(state: &mut EngineState, id: ObjectId, file: &str) {
        state
            .add_component(id, &ComponentKind::Script, [("file".to_string(), PropertyValue::from(file))])
            .unwrap();
    }

    #[test]
    fn invalid_config_is_fatal_at_startup() {
        let config = EngineConfig {
            viewport_width: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(EngineState::new(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn destroy_cascades_to_every_manager() {
        let mut state = engine();
        state.scripts.register_source(
            "goodbye.rhai",
            r#"fn cleanup(obj) { obj.state.set("last_name", obj.name); }"#,
        );
        let id = state.create_object("Guard", false);
        script(&mut state, id, "goodbye.rhai");
        state
            .add_component(id, &ComponentKind::BehaviorTree, [])
            .unwrap();
        state.add_component(id, &ComponentKind::Camera, []).unwrap();

        let services = state.services.clone();
        state.scripts.update(&state.scene, &services, 0.1);
        state.behavior.tick(&mut state.scene.borrow_mut(), 0.1);
        state.camera.pick_default(&mut state.scene.borrow_mut());
        assert!(state.behavior.state(id).is_some());
        assert_eq!(state.camera.active_camera(), Some(id));

        state.destroy_object(id).unwrap();
        assert_eq!(state.scripts.binding_count(), 0);
        assert!(state.behavior.state(id).is_none());
        assert_eq!(state.camera.active_camera(), None);
        let last = state.store().get("last_name").and_then(|v| v.into_string().ok());
        assert_eq!(last.as_deref(), Some("Guard"));

        assert!(matches!(state.destroy_object(id), Err(SceneError::UnknownObject(_))));
        assert!(matches!(
            state.add_component(id, &ComponentKind::Script, []),
            Err(SceneError::UnknownObject(_))
        ));
    }

    #[test]
    fn removing_a_script_component_runs_cleanup_right_away() {
        let mut state = engine();
        state
            .scripts
            .register_source("count.rhai", r#"fn cleanup(obj) { obj.state.set("cleaned", true); }"#);
        let id = state.create_object("Box", false);
        script(&mut state, id, "count.rhai");
        let services = state.services.clone();
        state.scripts.update(&state.scene, &services, 0.1);
        assert_eq!(state.scripts.binding_states(id), vec![BindingState::Initialized]);

        let removed = state.remove_component(id, &ComponentKind::Script).unwrap();
        assert!(removed.is_some());
        assert!(state.scripts.binding_states(id).is_empty());
        assert!(state.store().contains("cleaned"));
    }

    #[test]
    fn changing_a_script_file_rebinds_right_away() {
        let mut state = engine();
        state
            .scripts
            .register_source("old.rhai", r#"fn cleanup(obj) { obj.state.set("old_cleaned", true); }"#);
        state.scripts.register_source("new.rhai", "fn update(obj, dt) {}");
        let id = state.create_object("Box", false);
        script(&mut state, id, "old.rhai");
        let services = state.services.clone();
        state.scripts.update(&state.scene, &services, 0.1);

        state.set_property(id, &ComponentKind::Script, "file", "new.rhai").unwrap();
        assert!(state.store().contains("old_cleaned"));
        assert_eq!(state.scripts.binding_states(id), vec![BindingState::Unbound]);
    }

    #[test]
    fn pause_only_applies_in_editor_mode() {
        let mut standalone = engine();
        standalone.set_paused(true);
        assert!(!standalone.is_game_paused());

        let mut editor = EngineState::new(EngineConfig {
            editor_mode: true,
            ..EngineConfig::default()
        })
        .unwrap();
        editor.set_paused(true);
        assert!(editor.is_game_paused());
    }

    #[test]
    fn scene_round_trip_keeps_blackboard_and_never_reuses_ids() {
        let mut state = engine();
        let guard = state.create_object("Guard", false);
        state.add_component(guard, &ComponentKind::BehaviorTree, []).unwrap();
        state.behavior.tick(&mut state.scene.borrow_mut(), 0.1);
        state
            .behavior
            .state_mut(guard)
            .unwrap()
            .set("alert", PropertyValue::Int(3));

        let path = std::env::temp_dir().join(format!("engine_state_{}.ron", std::process::id()));
        state.save_scene(&path).unwrap();
        let before = state.scene().peek_next_id();

        state.new_scene("Empty");
        assert!(state.find("Guard").is_none());
        let fresh = state.create_object("Fresh", false);
        assert!(fresh >= before);

        state.load_scene(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(state.find("Guard"), Some(guard));
        assert!(state.create_object("Later", false) > fresh);

        state.behavior.tick(&mut state.scene.borrow_mut(), 0.1);
        assert_eq!(
            state.behavior.state(guard).and_then(|s| s.get("alert")),
            Some(&PropertyValue::Int(3))
        );
    }

    #[test]
    fn corrupt_scene_file_is_fatal() {
        let mut state = engine();
        let path = std::env::temp_dir().join(format!("engine_state_bad_{}.ron", std::process::id()));
        std::fs::write(&path, "(name: \"Broken\", objects: [").unwrap();
        assert!(matches!(state.load_scene(&path), Err(EngineError::Fatal(_))));
        std::fs::remove_file(&path).ok();
    }
}
