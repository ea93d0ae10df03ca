//! What a condition or action sees while it runs.

use crate::AiError;
use engine_core::{Component, ObjectId, PropertyValue, Vec3};
use scene::SceneGraph;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Per-object blackboard kept between ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiState {
    pub blackboard: BTreeMap<String, PropertyValue>,
    waits: HashMap<usize, f32>,
    visited_waits: HashSet<usize>,
}

impl AiState {
    pub fn from_blackboard(blackboard: BTreeMap<String, PropertyValue>) -> Self {
        Self {
            blackboard,
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.blackboard.get(key)
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.blackboard.get(key).and_then(PropertyValue::as_f32)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.blackboard.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.blackboard.remove(key)
    }

    pub(crate) fn begin_tick(&mut self) {
        self.visited_waits.clear();
    }

    /// Wait nodes not reached this tick start over next time.
    pub(crate) fn end_tick(&mut self) {
        let visited = &self.visited_waits;
        self.waits.retain(|node, _| visited.contains(node));
    }

    pub(crate) fn advance_wait(&mut self, node: usize, seconds: f32, dt: f32) -> bool {
        self.visited_waits.insert(node);
        let elapsed = self.waits.entry(node).or_insert(0.0);
        *elapsed += dt.max(0.0);
        if *elapsed >= seconds {
            self.waits.remove(&node);
            return true;
        }
        false
    }
}

/// The object a leaf runs for, its target and blackboard.
pub struct BtContext<'a> {
    pub scene: &'a mut SceneGraph,
    pub object: ObjectId,
    pub target: Option<ObjectId>,
    pub state: &'a mut AiState,
    pub dt: f32,
}

impl BtContext<'_> {
    pub fn position(&self) -> Result<Vec3, AiError> {
        let object = self
            .scene
            .get(self.object)
            .ok_or(scene::SceneError::UnknownObject(self.object))?;
        Ok(object.transform.position3())
    }

    /// Position of the tracked object, if it is set and still in the scene.
    pub fn target_position(&self) -> Option<Vec3> {
        let target = self.scene.get(self.target?)?;
        Some(target.transform.position3())
    }

    pub fn distance_to_target(&self) -> Result<Option<f32>, AiError> {
        let position = self.position()?;
        Ok(self.target_position().map(|t| t.distance(position)))
    }

    /// Move along `direction` at `speed` units per second.
    ///
    /// Bodies with a rigidbody get their velocity set and leave integration to physics;
    /// anything else is translated directly. 2D objects ignore the z component.
    pub fn move_along(&mut self, direction: Vec3, speed: f32) -> Result<(), AiError> {
        let velocity = direction * speed;
        let dt = self.dt;
        let object = self.scene.require_mut(self.object)?;
        let is_3d = object.is_3d();
        let body = object.components_mut().iter_mut().find_map(|c| match c {
            Component::Rigidbody2D(rb) if !is_3d => Some(Body::Planar(&mut rb.velocity)),
            Component::Rigidbody3D(rb) if is_3d => Some(Body::Spatial(&mut rb.velocity)),
            _ => None,
        });
        let has_body = match body {
            Some(Body::Planar(v)) => {
                *v = velocity.truncate();
                true
            }
            Some(Body::Spatial(v)) => {
                *v = velocity;
                true
            }
            None => false,
        };
        if !has_body {
            let delta = if is_3d { velocity } else { Vec3::new(velocity.x, velocity.y, 0.0) };
            object.transform.translate3(delta * dt);
        }
        Ok(())
    }

    /// Clear any velocity written by a previous action.
    pub fn stop(&mut self) -> Result<(), AiError> {
        self.move_along(Vec3::ZERO, 0.0)
    }
}

enum Body<'a> {
    Planar(&'a mut glam::Vec2),
    Spatial(&'a mut Vec3),
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::ComponentKind;
    use glam::Vec2;

    #[test]
    fn movement_prefers_rigidbody_velocity() {
        let mut scene = SceneGraph::new("Test");
        let body = scene.create_object("Body", false);
        scene
            .get_mut(body)
            .unwrap()
            .add_component(&ComponentKind::Rigidbody2D, [])
            .unwrap();
        let free = scene.create_object("Free", false);
        let mut state = AiState::default();

        for id in [body, free] {
            let mut ctx = BtContext {
                scene: &mut scene,
                object: id,
                target: None,
                state: &mut state,
                dt: 0.5,
            };
            ctx.move_along(Vec3::new(1.0, 0.0, 3.0), 4.0).unwrap();
        }

        let rb = scene.get(body).unwrap().get_component(&ComponentKind::Rigidbody2D).unwrap().property("velocity").unwrap();
        assert_eq!(rb, PropertyValue::Vec2(Vec2::new(4.0, 0.0)));
        assert_eq!(scene.get(body).unwrap().transform.position3(), Vec3::ZERO);
        assert_eq!(scene.get(free).unwrap().transform.position3(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn wait_resets_when_not_reached() {
        let mut state = AiState::default();
        state.begin_tick();
        assert!(!state.advance_wait(3, 1.0, 0.6));
        state.end_tick();

        state.begin_tick();
        state.end_tick();

        state.begin_tick();
        assert!(!state.advance_wait(3, 1.0, 0.6), "elapsed time was dropped");
        assert!(state.advance_wait(3, 1.0, 0.6));
    }
}
