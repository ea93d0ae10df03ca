//! Per-frame physics step over the scene graph.

use crate::{aabb_overlap, has_valid_mass, integrate, resolve_contact, sweep_and_prune, BodyState, Contact, PhysicsVector};
use engine_core::ObjectId;
use glam::{Vec2, Vec3};
use scene::SceneGraph;
use std::collections::HashSet;

/// Integrates rigid bodies and resolves box overlaps for 2D and 3D objects.
pub struct PhysicsSystem {
    /// Used when the scene does not override gravity.
    pub gravity: Vec3,
    contacts: Vec<Contact>,
    warned_mass: HashSet<ObjectId>,
}

impl Default for PhysicsSystem {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -9.81, 0.0))
    }
}

impl PhysicsSystem {
    pub fn new(gravity: Vec3) -> Self {
        log::info!("Physics system initialized (gravity {:?})", gravity);
        Self {
            gravity,
            contacts: Vec::new(),
            warned_mass: HashSet::new(),
        }
    }

    /// Gravity in effect for `scene`.
    pub fn effective_gravity(&self, scene: &SceneGraph) -> Vec3 {
        scene.settings.gravity.unwrap_or(self.gravity)
    }

    /// Run one step: integrate, then detect and resolve collisions, for both dimensions.
    pub fn step(&mut self, scene: &mut SceneGraph, dt: f32) {
        self.contacts.clear();
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }
        let gravity = self.effective_gravity(scene);
        self.step_dimension::<Vec2>(scene, gravity, dt);
        self.step_dimension::<Vec3>(scene, gravity, dt);
    }

    /// Contacts found by the last [`PhysicsSystem::step`].
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Contacts of the last step that involve `id`.
    pub fn contacts_of(&self, id: ObjectId) -> impl Iterator<Item = &Contact> + '_ {
        self.contacts.iter().filter(move |c| c.involves(id))
    }

    /// Forget per-object bookkeeping, e.g. when a new scene is loaded.
    pub fn reset(&mut self) {
        self.contacts.clear();
        self.warned_mass.clear();
    }

    fn step_dimension<V: PhysicsVector>(&mut self, scene: &mut SceneGraph, gravity: Vec3, dt: f32) {
        let gravity = V::from_vec3(gravity);
        let mut bodies: Vec<BodyState<V>> = Vec::new();

        for id in scene.object_ids() {
            let Some(object) = scene.get_mut(id) else {
                continue;
            };
            if object.is_3d() != V::IS_3D {
                continue;
            }

            let half_extents = object
                .components()
                .iter()
                .find_map(V::collider_half_extents)
                .map(|half| {
                    let scale = V::from_vec3(object.transform.scale3());
                    half.abs_components().mul_components(scale.abs_components())
                });

            let mut inverse_mass = 0.0;
            let mut restitution = 0.0;
            let mut velocity = V::default();
            let mut displacement = V::default();

            if let Some(body) = object.components_mut().iter_mut().find_map(V::rigidbody_mut) {
                if body.is_dynamic && !has_valid_mass(body) {
                    if self.warned_mass.insert(id) {
                        log::warn!("Object {} has invalid rigidbody mass {}; skipping it", id, body.mass);
                    } else {
                        log::debug!("Skipping object {} with invalid mass", id);
                    }
                    continue;
                }
                displacement = integrate(body, gravity, dt);
                velocity = body.velocity;
                restitution = engine_core::math::unit_clamp(body.restitution);
                if body.is_dynamic {
                    inverse_mass = 1.0 / body.mass;
                }
            }

            if displacement != V::default() {
                object.transform.translate3(displacement.to_vec3());
            }

            if let Some(half_extents) = half_extents {
                bodies.push(BodyState {
                    id,
                    center: V::from_vec3(object.transform.position3()),
                    half_extents,
                    velocity,
                    inverse_mass,
                    restitution,
                });
            }
        }

        if bodies.len() < 2 {
            return;
        }

        for (i, j) in sweep_and_prune(&bodies) {
            let Some((normal, penetration)) = aabb_overlap(&bodies[i], &bodies[j]) else {
                continue;
            };
            self.contacts.push(Contact {
                a: bodies[i].id,
                b: bodies[j].id,
                normal: normal.to_vec3(),
                penetration,
            });
            let (low, high) = bodies.split_at_mut(j);
            resolve_contact(&mut low[i], &mut high[0], normal, penetration);
        }

        for body in bodies.iter().filter(|b| b.is_dynamic()) {
            let Some(object) = scene.get_mut(body.id) else {
                continue;
            };
            object.transform.set_position3(body.center.to_vec3());
            if let Some(rb) = object.components_mut().iter_mut().find_map(V::rigidbody_mut) {
                rb.velocity = body.velocity;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use engine_core::{ComponentKind, PropertyValue};

    fn props(pairs: &[(&str, PropertyValue)]) -> Vec<(String, PropertyValue)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn spawn_box(scene: &mut SceneGraph, name: &str, position: Vec2, body: Option<Vec<(String, PropertyValue)>>) -> ObjectId {
        let id = scene.create_object(name, false);
        let object = scene.get_mut(id).unwrap();
        object.transform.set_position3(position.extend(0.0));
        object.add_component(&ComponentKind::BoxCollider2D, []).unwrap();
        if let Some(body) = body {
            object.add_component(&ComponentKind::Rigidbody2D, body).unwrap();
        }
        id
    }

    #[test]
    fn falling_box_lands_on_static_floor() {
        let mut scene = SceneGraph::new("Test");
        let floor = spawn_box(&mut scene, "Floor", Vec2::ZERO, None);
        let crate_id = spawn_box(
            &mut scene,
            "Crate",
            Vec2::new(0.0, 1.5),
            Some(props(&[("restitution", PropertyValue::Float(0.0))])),
        );

        let mut physics = PhysicsSystem::new(Vec3::new(0.0, -10.0, 0.0));
        for _ in 0..120 {
            physics.step(&mut scene, 1.0 / 60.0);
        }

        let floor_pos = scene.get(floor).unwrap().transform.position3();
        assert_eq!(floor_pos, Vec3::ZERO);
        let crate_pos = scene.get(crate_id).unwrap().transform.position3();
        assert!(crate_pos.y >= 0.99 && crate_pos.y < 1.05, "crate rests on the floor, y = {}", crate_pos.y);
        assert!(physics.contacts_of(crate_id).count() <= 1);
    }

    #[test]
    fn steady_force_accumulates_over_fixed_steps() {
        let mut scene = SceneGraph::new("Test");
        let id = scene.create_object("Sled", false);
        scene
            .get_mut(id)
            .unwrap()
            .add_component(
                &ComponentKind::Rigidbody2D,
                props(&[
                    ("force", PropertyValue::Vec2(Vec2::X)),
                    ("linear_damping", PropertyValue::Float(0.0)),
                ]),
            )
            .unwrap();

        let mut physics = PhysicsSystem::new(Vec3::ZERO);
        for _ in 0..120 {
            physics.step(&mut scene, 1.0 / 60.0);
        }

        let object = scene.get(id).unwrap();
        let velocity = object
            .get_component(&ComponentKind::Rigidbody2D)
            .unwrap()
            .property("velocity")
            .unwrap()
            .as_vec2()
            .unwrap();
        assert_relative_eq!(velocity.x, 2.0, epsilon = 1e-4);
        assert_relative_eq!(velocity.y, 0.0);
        // semi-implicit Euler: x = dt^2 * (1 + 2 + ... + 120)
        assert_relative_eq!(object.transform.position3().x, 7260.0 / 3600.0, epsilon = 1e-3);
    }

    #[test]
    fn heavy_box_rests_on_static_box_without_pushing_it() {
        let mut scene = SceneGraph::new("Test");
        let base = spawn_box(&mut scene, "Base", Vec2::new(0.0, -1.0), None);
        let top = spawn_box(
            &mut scene,
            "Top",
            Vec2::ZERO,
            Some(props(&[("mass", PropertyValue::Float(2.0))])),
        );

        let mut physics = PhysicsSystem::new(Vec3::new(0.0, -9.81, 0.0));
        for _ in 0..120 {
            physics.step(&mut scene, 1.0 / 60.0);
        }

        assert_eq!(scene.get(base).unwrap().transform.position3(), Vec3::new(0.0, -1.0, 0.0));
        let object = scene.get(top).unwrap();
        let y = object.transform.position3().y;
        assert!(y > -0.02 && y < 0.05, "top box stays on the base, y = {}", y);
        let velocity = object
            .get_component(&ComponentKind::Rigidbody2D)
            .unwrap()
            .property("velocity")
            .unwrap()
            .as_vec2()
            .unwrap();
        assert!(velocity.y.abs() < 0.2, "resting velocity is clamped, vy = {}", velocity.y);
    }

    #[test]
    fn invalid_mass_body_is_skipped() {
        let mut scene = SceneGraph::new("Test");
        let id = spawn_box(
            &mut scene,
            "Broken",
            Vec2::new(0.0, 5.0),
            Some(props(&[("mass", PropertyValue::Float(0.0))])),
        );
        let mut physics = PhysicsSystem::default();
        physics.step(&mut scene, 0.1);
        assert_eq!(scene.get(id).unwrap().transform.position3(), Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn scene_gravity_overrides_default() {
        let mut scene = SceneGraph::new("Test");
        scene.settings.gravity = Some(Vec3::ZERO);
        let id = spawn_box(&mut scene, "Floating", Vec2::new(0.0, 3.0), Some(Vec::new()));
        let mut physics = PhysicsSystem::default();
        physics.step(&mut scene, 0.5);
        assert_eq!(scene.get(id).unwrap().transform.position3().y, 3.0);
    }

    #[test]
    fn dimensions_do_not_interact() {
        let mut scene = SceneGraph::new("Test");
        spawn_box(&mut scene, "Flat", Vec2::ZERO, None);
        let cube = scene.create_object("Cube", true);
        {
            let object = scene.get_mut(cube).unwrap();
            object.add_component(&ComponentKind::BoxCollider3D, []).unwrap();
            object.add_component(&ComponentKind::Rigidbody3D, []).unwrap();
        }
        let mut physics = PhysicsSystem::new(Vec3::ZERO);
        physics.step(&mut scene, 0.1);
        assert!(physics.contacts().is_empty());
    }

    #[test]
    fn head_on_dynamic_pair_bounces_apart() {
        let mut scene = SceneGraph::new("Test");
        let bounce = |v: f32| {
            props(&[
                ("restitution", PropertyValue::Float(1.0)),
                ("linear_damping", PropertyValue::Float(0.0)),
                ("velocity", PropertyValue::Vec2(Vec2::new(v, 0.0))),
            ])
        };
        let left = spawn_box(&mut scene, "Left", Vec2::new(-0.45, 0.0), Some(bounce(1.0)));
        let right = spawn_box(&mut scene, "Right", Vec2::new(0.45, 0.0), Some(bounce(-1.0)));

        let mut physics = PhysicsSystem::new(Vec3::ZERO);
        physics.step(&mut scene, 0.01);

        let velocity = |id| {
            scene
                .get(id)
                .unwrap()
                .get_component(&ComponentKind::Rigidbody2D)
                .unwrap()
                .property("velocity")
                .unwrap()
                .as_vec2()
                .unwrap()
        };
        assert_relative_eq!(velocity(left).x, -1.0, epsilon = 1e-4);
        assert_relative_eq!(velocity(right).x, 1.0, epsilon = 1e-4);
        assert_eq!(physics.contacts().len(), 1);
    }
}
