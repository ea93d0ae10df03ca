//! The scene graph: owner of every live object.

use crate::{SceneError, SceneObject};
use engine_core::ObjectId;
use glam::Vec3;
use hecs::{Entity, Ref, World};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-scene settings stored alongside the objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSettings {
    /// Overrides the engine's configured gravity when set.
    #[serde(default)]
    pub gravity: Option<Vec3>,
}

/// All live objects of one scene.
///
/// Objects live in a `hecs::World`, one entity each. Insertion order is tracked
/// separately so iteration is deterministic.
pub struct SceneGraph {
    world: World,
    order: Vec<Entity>,
    ids: HashMap<ObjectId, Entity>,
    next_id: u64,
    pub name: String,
    pub settings: SceneSettings,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl SceneGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            world: World::new(),
            order: Vec::new(),
            ids: HashMap::new(),
            next_id: 1,
            name: name.into(),
            settings: SceneSettings::default(),
        }
    }

    /// Create an empty object with identity transform and return its fresh id.
    pub fn create_object(&mut self, name: impl Into<String>, is_3d: bool) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        let object = SceneObject::new(id, name, is_3d);
        self.spawn(object);
        log::debug!("Created object {} '{}'", id, self.name_of(id).unwrap_or_default());
        id
    }

    /// Insert an object that already has an id (scene loading).
    ///
    /// The id counter is advanced past `object.id()` so later objects never collide.
    pub fn insert_object(&mut self, object: SceneObject) -> Result<ObjectId, SceneError> {
        let id = object.id();
        if self.ids.contains_key(&id) {
            return Err(SceneError::DuplicateId(id));
        }
        self.next_id = self.next_id.max(id.raw() + 1);
        self.spawn(object);
        Ok(id)
    }

    fn spawn(&mut self, object: SceneObject) {
        let id = object.id();
        let entity = self.world.spawn((object,));
        self.order.push(entity);
        self.ids.insert(id, entity);
    }

    /// Remove an object from the scene and hand it back.
    pub fn destroy_object(&mut self, id: ObjectId) -> Result<SceneObject, SceneError> {
        let entity = self.ids.remove(&id).ok_or(SceneError::UnknownObject(id))?;
        self.order.retain(|e| *e != entity);
        let object = self
            .world
            .remove_one::<SceneObject>(entity)
            .map_err(|_| SceneError::Corrupt(format!("object {id} had no entity data")))?;
        self.world.despawn(entity).ok();
        log::debug!("Destroyed object {} '{}'", id, object.name);
        Ok(object)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<Ref<'_, SceneObject>> {
        let entity = *self.ids.get(&id)?;
        self.world.get::<&SceneObject>(entity).ok()
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        let entity = *self.ids.get(&id)?;
        self.world.query_one_mut::<&mut SceneObject>(entity).ok()
    }

    /// Like [`SceneGraph::get_mut`] but failing with `UnknownObject`.
    pub fn require_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject, SceneError> {
        self.get_mut(id).ok_or(SceneError::UnknownObject(id))
    }

    pub fn name_of(&self, id: ObjectId) -> Option<String> {
        self.get(id).map(|o| o.name.clone())
    }

    /// Resolve a textual reference: an id (`#3` or `3`) that is live, else the first
    /// object with that exact name in insertion order.
    pub fn find(&self, name_or_id: &str) -> Option<ObjectId> {
        if let Some(id) = ObjectId::parse(name_or_id) {
            if self.contains(id) {
                return Some(id);
            }
        }
        self.find_by_name(name_or_id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects().find(|o| o.name == name).map(|o| o.id())
    }

    /// Ids of every live object in insertion order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects().map(|o| o.id()).collect()
    }

    /// Every live object in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = Ref<'_, SceneObject>> + '_ {
        self.order
            .iter()
            .filter_map(move |entity| self.world.get::<&SceneObject>(*entity).ok())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop every object. The id counter keeps counting.
    pub fn clear(&mut self) {
        self.world.clear();
        self.order.clear();
        self.ids.clear();
    }

    /// The id the next created object will get.
    pub fn peek_next_id(&self) -> ObjectId {
        ObjectId(self.next_id)
    }

    /// Never hand out an id below `next`. Used when this graph replaces another one.
    pub fn continue_ids_from(&mut self, next: ObjectId) {
        self.next_id = self.next_id.max(next.raw());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_never_reused() {
        let mut scene = SceneGraph::new("Test");
        let a = scene.create_object("A", false);
        let b = scene.create_object("B", false);
        assert_ne!(a, b);

        scene.destroy_object(b).unwrap();
        let c = scene.create_object("C", false);
        assert_ne!(c, b);
        assert!(c > b);
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut scene = SceneGraph::new("Test");
        let a = scene.create_object("A", false);
        let b = scene.create_object("B", true);
        let c = scene.create_object("C", false);
        scene.destroy_object(b).unwrap();
        let d = scene.create_object("D", false);
        assert_eq!(scene.object_ids(), vec![a, c, d]);
    }

    #[test]
    fn find_prefers_live_id_then_first_name() {
        let mut scene = SceneGraph::new("Test");
        let first = scene.create_object("Enemy", false);
        let _second = scene.create_object("Enemy", false);
        assert_eq!(scene.find("Enemy"), Some(first));
        assert_eq!(scene.find(&first.to_string()), Some(first));
        assert_eq!(scene.find("Nobody"), None);
    }

    #[test]
    fn destroyed_objects_are_unreachable() {
        let mut scene = SceneGraph::new("Test");
        let id = scene.create_object("Gone", true);
        let removed = scene.destroy_object(id).unwrap();
        assert_eq!(removed.name, "Gone");
        assert!(scene.get(id).is_none());
        assert!(scene.get_mut(id).is_none());
        assert!(matches!(
            scene.destroy_object(id),
            Err(SceneError::UnknownObject(missing)) if missing == id
        ));
    }

    #[test]
    fn insert_rejects_duplicates_and_advances_counter() {
        let mut scene = SceneGraph::new("Test");
        scene.insert_object(SceneObject::new(ObjectId(10), "Loaded", false)).unwrap();
        assert!(matches!(
            scene.insert_object(SceneObject::new(ObjectId(10), "Again", false)),
            Err(SceneError::DuplicateId(_))
        ));
        assert_eq!(scene.create_object("Fresh", false), ObjectId(11));
    }
}
