//! The capability object handed to script hooks.

use audio::AudioManager;
use engine_core::{Component, ComponentError, ComponentKind, ObjectId, ObjectTransform, PropertyValue, Vec3};
use input::InputState;
use network::NetworkManager;
use rhai::Dynamic;
use scene::{SceneError, SceneGraph, SceneObject};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use crate::ScriptError;

/// The active scene, shared between the engine and every sandbox.
///
/// Never hold a borrow across a hook call.
pub type SharedScene = Rc<RefCell<SceneGraph>>;

/// Session-wide key/value store scripts use to share state.
#[derive(Debug, Default)]
pub struct GlobalStore {
    values: HashMap<String, Dynamic>,
}

impl GlobalStore {
    pub fn get(&self, key: &str) -> Option<Dynamic> {
        self.values.get(key).cloned()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Dynamic) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Dynamic> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// The engine managers scripts may reach. Nothing else of the engine is exposed.
#[derive(Clone)]
pub struct ScriptServices {
    pub input: Rc<RefCell<InputState>>,
    pub audio: Rc<RefCell<AudioManager>>,
    pub store: Rc<RefCell<GlobalStore>>,
    pub network: Rc<RefCell<NetworkManager>>,
}

impl Default for ScriptServices {
    fn default() -> Self {
        Self::new(AudioManager::default(), NetworkManager::default())
    }
}

impl ScriptServices {
    pub fn new(audio: AudioManager, network: NetworkManager) -> Self {
        Self {
            input: Rc::new(RefCell::new(InputState::new())),
            audio: Rc::new(RefCell::new(audio)),
            store: Rc::new(RefCell::new(GlobalStore::default())),
            network: Rc::new(RefCell::new(network)),
        }
    }
}

/// A script's view of one scene object.
///
/// Every operation re-resolves the object, so a sandbox outliving its object fails
/// with [`SceneError::UnknownObject`] instead of touching stale data.
#[derive(Clone)]
pub struct ScriptSandbox {
    object: ObjectId,
    scene: SharedScene,
    services: ScriptServices,
}

impl ScriptSandbox {
    pub fn new(object: ObjectId, scene: SharedScene, services: ScriptServices) -> Self {
        Self { object, scene, services }
    }

    pub fn id(&self) -> ObjectId {
        self.object
    }

    pub fn is_live(&self) -> bool {
        self.scene.borrow().contains(self.object)
    }

    /// Run `f` against the live object.
    pub fn with_object<R>(&self, f: impl FnOnce(&SceneObject) -> R) -> Result<R, SceneError> {
        let scene = self.scene.borrow();
        let object = scene.get(self.object).ok_or(SceneError::UnknownObject(self.object))?;
        Ok(f(&object))
    }

    pub fn with_object_mut<R>(&self, f: impl FnOnce(&mut SceneObject) -> R) -> Result<R, SceneError> {
        let mut scene = self.scene.borrow_mut();
        let object = scene.require_mut(self.object)?;
        Ok(f(object))
    }

    pub fn name(&self) -> Result<String, SceneError> {
        self.with_object(|o| o.name.clone())
    }

    pub fn is_3d(&self) -> Result<bool, SceneError> {
        self.with_object(|o| o.is_3d())
    }

    pub fn transform(&self) -> Result<ObjectTransform, SceneError> {
        self.with_object(|o| o.transform)
    }

    /// Replace the transform. The 2D/3D flag of an object is fixed.
    pub fn set_transform(&self, transform: ObjectTransform) -> Result<(), SceneError> {
        let id = self.object;
        self.with_object_mut(|o| {
            if o.is_3d() != transform.is_3d() {
                return Err(SceneError::DimensionMismatch(id));
            }
            o.transform = transform;
            Ok(())
        })?
    }

    pub fn position(&self) -> Result<Vec3, SceneError> {
        self.with_object(|o| o.transform.position3())
    }

    pub fn set_position(&self, position: Vec3) -> Result<(), SceneError> {
        self.with_object_mut(|o| o.transform.set_position3(position))
    }

    pub fn translate(&self, delta: Vec3) -> Result<(), SceneError> {
        self.with_object_mut(|o| o.transform.translate3(delta))
    }

    pub fn has_component(&self, kind: &ComponentKind) -> Result<bool, SceneError> {
        self.with_object(|o| o.has_component(kind))
    }

    /// A snapshot of the first component of `kind`.
    pub fn component(&self, kind: &ComponentKind) -> Result<Option<Component>, SceneError> {
        self.with_object(|o| o.get_component(kind).cloned())
    }

    /// Read a property of the `ordinal`-th component of `kind`.
    pub fn property(&self, kind: &ComponentKind, ordinal: usize, name: &str) -> Result<PropertyValue, ScriptError> {
        let value = self.with_object(|o| match o.nth_component(kind, ordinal) {
            Some(component) => component.property(name),
            None => Err(ComponentError::Missing {
                kind: kind.name().to_string(),
            }),
        })??;
        Ok(value)
    }

    /// Write a property of the `ordinal`-th component of `kind`. Takes effect immediately.
    pub fn set_property(
        &self,
        kind: &ComponentKind,
        ordinal: usize,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), ScriptError> {
        self.with_object_mut(|o| match o.nth_component_mut(kind, ordinal) {
            Some(component) => component.set_property(name, value),
            None => Err(ComponentError::Missing {
                kind: kind.name().to_string(),
            }),
        })??;
        Ok(())
    }

    /// Another object of the current scene, by id or name.
    pub fn find_object(&self, name_or_id: &str) -> Option<ScriptSandbox> {
        let id = self.scene.borrow().find(name_or_id)?;
        Some(Self::new(id, self.scene.clone(), self.services.clone()))
    }

    pub fn input(&self) -> Ref<'_, InputState> {
        self.services.input.borrow()
    }

    pub fn audio(&self) -> RefMut<'_, AudioManager> {
        self.services.audio.borrow_mut()
    }

    pub fn store(&self) -> RefMut<'_, GlobalStore> {
        self.services.store.borrow_mut()
    }

    pub fn network(&self) -> RefMut<'_, NetworkManager> {
        self.services.network.borrow_mut()
    }

    pub fn services(&self) -> &ScriptServices {
        &self.services
    }
}
