//! Active camera selection, target following and view matrices.

use engine_core::math::{smoothing_factor, wrap_degrees};
use engine_core::{Camera, Component, ComponentKind, ObjectId, ObjectTransform, PropertyValue};
use glam::{Mat4, Quat, Vec3};
use scene::{SceneError, SceneGraph};

/// Follow smoothing is `1 - exp(-follow_speed * FOLLOW_RESPONSE * dt)`.
const FOLLOW_RESPONSE: f32 = 5.0;
const MAX_PITCH_DEGREES: f32 = 89.0;

/// Camera state handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    pub object: ObjectId,
    pub is_3d: bool,
    pub position: Vec3,
    pub rotation: Quat,
    pub zoom: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
    /// Half the viewport in pixels, used for the 2D orthographic projection.
    pub half_extent: glam::Vec2,
}

impl CameraView {
    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        if self.is_3d {
            let eye = self.position;
            let target = eye + self.rotation * Vec3::NEG_Z;
            Mat4::look_at_rh(eye, target, Vec3::Y)
        } else {
            Mat4::from_rotation_translation(self.rotation, self.position).inverse()
        }
    }

    /// Get the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        if self.is_3d {
            Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
        } else {
            let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
            let half = self.half_extent / zoom;
            Mat4::orthographic_rh(-half.x, half.x, -half.y, half.y, -self.far, self.far)
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

/// Tracks which `CameraComponent` renders and moves it toward its follow target.
#[derive(Debug)]
pub struct CameraManager {
    active: Option<ObjectId>,
    /// A camera has been chosen for the current scene. Losing it leaves no active camera.
    picked: bool,
    viewport: (u32, u32),
}

impl CameraManager {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            active: None,
            picked: false,
            viewport: (viewport_width.max(1), viewport_height.max(1)),
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    pub fn active_camera(&self) -> Option<ObjectId> {
        self.active
    }

    /// Make `id` the only active camera.
    pub fn set_active_camera(&mut self, scene: &mut SceneGraph, id: ObjectId) -> Result<(), SceneError> {
        if !scene.require_mut(id)?.has_component(&ComponentKind::Camera) {
            return Err(engine_core::ComponentError::Missing {
                kind: ComponentKind::Camera.name().to_string(),
            }
            .into());
        }
        for other in scene.object_ids() {
            if let Some(camera) = camera_mut(scene, other) {
                camera.is_active = other == id;
            }
        }
        self.active = Some(id);
        self.picked = true;
        log::info!("Active camera set to {}", id);
        Ok(())
    }

    /// Forget the camera and any follow target pointing at an object about to be destroyed.
    pub fn forget_object(&mut self, scene: &mut SceneGraph, id: ObjectId) {
        if self.active == Some(id) {
            self.active = None;
            log::info!("Active camera {} destroyed, no camera is active", id);
        }
        for other in scene.object_ids() {
            let target = match camera_mut(scene, other) {
                Some(camera) if !camera.follow_target.is_empty() => camera.follow_target.clone(),
                _ => continue,
            };
            if scene.find(&target) == Some(id) {
                if let Some(camera) = camera_mut(scene, other) {
                    camera.follow_target.clear();
                }
                log::debug!("Camera {} stopped following destroyed object {}", other, id);
            }
        }
    }

    /// Drop the active camera so the next scene picks its own.
    pub fn reset(&mut self) {
        self.active = None;
        self.picked = false;
    }

    /// Choose the scene's starting camera, once per scene.
    ///
    /// Prefers the first camera flagged `is_active`, else the first camera in scene order.
    /// Does nothing once a camera was chosen, even if it was destroyed since.
    pub fn pick_default(&mut self, scene: &mut SceneGraph) {
        if self.picked {
            return;
        }
        let cameras: Vec<(ObjectId, bool)> = scene
            .objects()
            .filter_map(|o| match o.get_component(&ComponentKind::Camera) {
                Some(Component::Camera(c)) => Some((o.id(), c.is_active)),
                _ => None,
            })
            .collect();
        let chosen = cameras
            .iter()
            .find(|(_, active)| *active)
            .or_else(|| cameras.first())
            .map(|(id, _)| *id);
        if let Some(id) = chosen {
            if let Some(camera) = camera_mut(scene, id) {
                camera.is_active = true;
            }
            self.active = Some(id);
            self.picked = true;
            log::info!("Using camera {}", id);
        }
    }

    /// Move the active camera toward its follow target and keep its rotation in range.
    pub fn update(&mut self, scene: &mut SceneGraph, dt: f32) {
        if let Some(id) = self.active {
            if !scene.get(id).is_some_and(|o| o.has_component(&ComponentKind::Camera)) {
                log::info!("Camera {} is gone, no camera is active", id);
                self.active = None;
            }
        }
        self.pick_default(scene);
        let Some(id) = self.active else {
            return;
        };
        let Some((target, speed)) = camera_mut(scene, id).map(|c| (c.follow_target.clone(), c.follow_speed)) else {
            return;
        };

        let goal = if target.is_empty() {
            None
        } else {
            match scene.find(&target).and_then(|t| scene.get(t).map(|o| o.transform.position3())) {
                Some(goal) => Some(goal),
                None => {
                    log::info!("Camera {} lost its follow target '{}'", id, target);
                    if let Some(camera) = camera_mut(scene, id) {
                        camera.follow_target.clear();
                    }
                    None
                }
            }
        };

        let Some(object) = scene.get_mut(id) else {
            return;
        };
        if let Some(goal) = goal {
            let t = smoothing_factor(speed.max(0.0) * FOLLOW_RESPONSE, dt);
            let current = object.transform.position3();
            object.transform.set_position3(current.lerp(goal, t));
        }
        match &mut object.transform {
            ObjectTransform::Planar(t) => t.rotation = wrap_degrees(t.rotation),
            ObjectTransform::Spatial(t) => {
                let euler = t.euler_degrees();
                let pitch = euler.x.clamp(-MAX_PITCH_DEGREES, MAX_PITCH_DEGREES);
                if pitch != euler.x {
                    t.set_euler_degrees(Vec3::new(pitch, euler.y, euler.z));
                }
            }
        }
    }

    /// The active camera's view, if there is one.
    pub fn view(&self, scene: &SceneGraph) -> Option<CameraView> {
        let id = self.active?;
        let object = scene.get(id)?;
        let Some(Component::Camera(camera)) = object.get_component(&ComponentKind::Camera) else {
            return None;
        };
        let transform = object.transform.to_3d();
        let (width, height) = self.viewport;
        Some(CameraView {
            object: id,
            is_3d: object.is_3d(),
            position: transform.position,
            rotation: transform.rotation,
            zoom: camera.zoom,
            fov_degrees: camera.fov,
            near: camera.near_clip,
            far: camera.far_clip,
            aspect: width as f32 / height as f32,
            half_extent: glam::Vec2::new(width as f32, height as f32) * 0.5,
        })
    }

    /// Read a camera property of the active camera.
    pub fn active_property(&self, scene: &SceneGraph, name: &str) -> Option<PropertyValue> {
        let object = scene.get(self.active?)?;
        object.get_component(&ComponentKind::Camera)?.property(name).ok()
    }
}

fn camera_mut(scene: &mut SceneGraph, id: ObjectId) -> Option<&mut Camera> {
    scene
        .get_mut(id)?
        .components_mut()
        .iter_mut()
        .find_map(|c| match c {
            Component::Camera(camera) => Some(camera),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera(scene: &mut SceneGraph, name: &str, follow: &str, active: bool) -> ObjectId {
        let id = scene.create_object(name, false);
        scene
            .get_mut(id)
            .unwrap()
            .add_component(
                &ComponentKind::Camera,
                [
                    ("follow_target".to_string(), PropertyValue::from(follow)),
                    ("is_active".to_string(), PropertyValue::Bool(active)),
                ],
            )
            .unwrap();
        id
    }

    #[test]
    fn follow_uses_exponential_smoothing() {
        let mut scene = SceneGraph::new("Test");
        let player = scene.create_object("Player", false);
        scene.get_mut(player).unwrap().transform.set_position3(Vec3::new(10.0, 0.0, 0.0));
        let cam = camera(&mut scene, "Cam", "Player", false);
        let mut manager = CameraManager::new(800, 600);

        manager.update(&mut scene, 0.1);
        let expected = 10.0 * (1.0 - (-0.5_f32).exp());
        assert_eq!(manager.active_camera(), Some(cam));
        assert_relative_eq!(scene.get(cam).unwrap().transform.position3().x, expected, epsilon = 1e-4);
    }

    #[test]
    fn flagged_camera_wins_and_destruction_leaves_none_active() {
        let mut scene = SceneGraph::new("Test");
        let first = camera(&mut scene, "First", "", false);
        let second = camera(&mut scene, "Second", "", true);
        let mut manager = CameraManager::new(800, 600);
        manager.pick_default(&mut scene);
        assert_eq!(manager.active_camera(), Some(second));

        manager.forget_object(&mut scene, second);
        scene.destroy_object(second).unwrap();
        for _ in 0..3 {
            manager.update(&mut scene, 0.1);
        }
        assert_eq!(manager.active_camera(), None);
        assert!(manager.view(&scene).is_none());
        assert_eq!(camera_mut(&mut scene, first).map(|c| c.is_active), Some(false));

        manager.set_active_camera(&mut scene, first).unwrap();
        manager.update(&mut scene, 0.1);
        assert_eq!(manager.active_camera(), Some(first));
        assert_eq!(manager.active_property(&scene, "is_active"), Some(PropertyValue::Bool(true)));
    }

    #[test]
    fn removed_camera_component_is_not_replaced() {
        let mut scene = SceneGraph::new("Test");
        let a = camera(&mut scene, "A", "", true);
        camera(&mut scene, "B", "", false);
        let mut manager = CameraManager::new(800, 600);
        manager.update(&mut scene, 0.1);
        assert_eq!(manager.active_camera(), Some(a));

        scene.get_mut(a).unwrap().remove_component(&ComponentKind::Camera);
        manager.update(&mut scene, 0.1);
        assert_eq!(manager.active_camera(), None);

        manager.reset();
        manager.pick_default(&mut scene);
        assert!(manager.active_camera().is_some(), "a new scene picks again");
    }

    #[test]
    fn destroyed_follow_target_is_cleared() {
        let mut scene = SceneGraph::new("Test");
        let player = scene.create_object("Player", false);
        let cam = camera(&mut scene, "Cam", &player.to_string(), true);
        let mut manager = CameraManager::new(800, 600);

        manager.forget_object(&mut scene, player);
        scene.destroy_object(player).unwrap();
        manager.update(&mut scene, 0.1);
        assert_eq!(manager.active_camera(), Some(cam));
        assert_eq!(manager.active_property(&scene, "follow_target"), Some(PropertyValue::from("")));
    }

    #[test]
    fn set_active_requires_a_camera() {
        let mut scene = SceneGraph::new("Test");
        let a = camera(&mut scene, "A", "", true);
        let b = camera(&mut scene, "B", "", false);
        let plain = scene.create_object("Plain", false);
        let mut manager = CameraManager::new(800, 600);

        assert!(manager.set_active_camera(&mut scene, plain).is_err());
        manager.set_active_camera(&mut scene, b).unwrap();
        assert_eq!(manager.active_camera(), Some(b));
        assert_eq!(camera_mut(&mut scene, a).map(|c| c.is_active), Some(false));
    }

    #[test]
    fn view_matrices_follow_dimension() {
        let mut scene = SceneGraph::new("Test");
        let cam = camera(&mut scene, "Cam", "", true);
        scene.get_mut(cam).unwrap().transform.set_position3(Vec3::new(5.0, 2.0, 0.0));
        let mut manager = CameraManager::new(800, 600);
        manager.pick_default(&mut scene);

        let view = manager.view(&scene).unwrap();
        assert!(!view.is_3d);
        let origin = view.view_matrix().transform_point3(Vec3::new(5.0, 2.0, 0.0));
        assert_relative_eq!(origin.length(), 0.0, epsilon = 1e-5);
        let corner = view.view_projection().transform_point3(Vec3::new(405.0, 302.0, 0.0));
        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(corner.y, 1.0, epsilon = 1e-4);
    }
}
