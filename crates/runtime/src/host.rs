//! The contract between the engine and whatever drives it (window, editor, test harness).

use crate::{CameraView, EngineError};
use engine_core::{Color, Component, ObjectId, TransformRaw};
use input::{InputEvent, InputState};
use scene::SceneGraph;
use std::collections::VecDeque;
use std::time::Duration;

/// Whether the loop should keep going after a host call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostControl {
    Continue,
    Stop,
}

/// Something the engine draws this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub object: ObjectId,
    pub is_3d: bool,
    /// Sprite layer; meshes draw on layer 0.
    pub layer: i64,
    /// Sprite asset, or the mesh asset for meshes.
    pub asset: String,
    /// Material asset; empty for sprites.
    pub material: String,
    pub tint: Color,
    pub transform: TransformRaw,
}

/// The settled state of one frame, handed to the host for rendering and audio.
#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub dt: f32,
    /// Sorted by layer; equal layers keep scene order.
    pub items: Vec<RenderItem>,
    pub camera: Option<CameraView>,
}

impl FrameSnapshot {
    /// Collect render items from every object with a sprite or mesh renderer.
    pub fn capture(scene: &SceneGraph, frame: u64, dt: f32, camera: Option<CameraView>) -> Self {
        let mut items = Vec::new();
        for object in scene.objects() {
            let transform = TransformRaw::from(&object.transform);
            for component in object.components() {
                let item = match component {
                    Component::SpriteRenderer(sprite) => RenderItem {
                        object: object.id(),
                        is_3d: object.is_3d(),
                        layer: sprite.layer,
                        asset: sprite.asset.clone(),
                        material: String::new(),
                        tint: sprite.tint,
                        transform,
                    },
                    Component::MeshRenderer(mesh) => RenderItem {
                        object: object.id(),
                        is_3d: object.is_3d(),
                        layer: 0,
                        asset: mesh.mesh_asset.clone(),
                        material: mesh.material_asset.clone(),
                        tint: Color::WHITE,
                        transform,
                    },
                    _ => continue,
                };
                items.push(item);
            }
        }
        items.sort_by_key(|item| item.layer);
        Self { frame, dt, items, camera }
    }

    /// Model matrices of every item, ready for an instance buffer.
    pub fn instance_data(&self) -> Vec<TransformRaw> {
        self.items.iter().map(|item| item.transform).collect()
    }

    /// Instance data as raw bytes.
    pub fn instance_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.instance_data()).to_vec()
    }
}

/// Drives the engine: supplies frame timing and input, consumes finished frames.
pub trait FrameHost {
    /// Fixed delta for this frame, or `None` to use wall-clock time.
    fn frame_delta(&mut self) -> Option<Duration> {
        None
    }

    /// Feed this frame's input. Called once per frame before scripts run.
    fn poll_input(&mut self, input: &mut InputState) -> HostControl;

    /// Receive the settled frame. An error here is fatal to the loop.
    fn present(&mut self, snapshot: &FrameSnapshot) -> Result<HostControl, EngineError>;
}

/// A host with no window: fixed timestep, scripted input, a frame limit.
#[derive(Debug)]
pub struct HeadlessHost {
    dt: Duration,
    frames_left: Option<u64>,
    input: VecDeque<Vec<InputEvent>>,
    presented: u64,
    last: Option<FrameSnapshot>,
}

impl HeadlessHost {
    /// Run `frames` frames of `dt` each, then stop. `None` runs until the engine stops.
    pub fn new(dt: Duration, frames: Option<u64>) -> Self {
        Self {
            dt,
            frames_left: frames,
            input: VecDeque::new(),
            presented: 0,
            last: None,
        }
    }

    /// Queue the events for one future frame. Frames are consumed in queue order.
    pub fn queue_input(&mut self, events: Vec<InputEvent>) {
        self.input.push_back(events);
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn last_snapshot(&self) -> Option<&FrameSnapshot> {
        self.last.as_ref()
    }
}

impl FrameHost for HeadlessHost {
    fn frame_delta(&mut self) -> Option<Duration> {
        Some(self.dt)
    }

    fn poll_input(&mut self, input: &mut InputState) -> HostControl {
        input.feed(self.input.pop_front().unwrap_or_default());
        if self.frames_left == Some(0) {
            HostControl::Stop
        } else {
            HostControl::Continue
        }
    }

    fn present(&mut self, snapshot: &FrameSnapshot) -> Result<HostControl, EngineError> {
        self.presented += 1;
        self.last = Some(snapshot.clone());
        match self.frames_left.as_mut() {
            Some(left) => {
                *left = left.saturating_sub(1);
                Ok(if *left == 0 { HostControl::Stop } else { HostControl::Continue })
            }
            None => Ok(HostControl::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{ComponentKind, PropertyValue};
    use input::ElementState;

    #[test]
    fn items_are_sorted_by_layer_keeping_scene_order() {
        let mut scene = SceneGraph::new("Test");
        for (name, layer) in [("Front", 2), ("Back", 0), ("Middle", 1), ("Back2", 0)] {
            let id = scene.create_object(name, false);
            scene
                .get_mut(id)
                .unwrap()
                .add_component(
                    &ComponentKind::SpriteRenderer,
                    [
                        ("asset".to_string(), PropertyValue::from(name)),
                        ("layer".to_string(), PropertyValue::Int(layer)),
                    ],
                )
                .unwrap();
        }
        scene.create_object("Invisible", false);

        let snapshot = FrameSnapshot::capture(&scene, 1, 0.016, None);
        let assets: Vec<&str> = snapshot.items.iter().map(|i| i.asset.as_str()).collect();
        assert_eq!(assets, vec!["Back", "Back2", "Middle", "Front"]);
        assert_eq!(snapshot.instance_bytes().len(), 4 * 64);
    }

    #[test]
    fn headless_host_stops_after_frame_limit() {
        let mut host = HeadlessHost::new(Duration::from_millis(10), Some(2));
        let mut input = InputState::new();
        host.queue_input(vec![InputEvent::Key {
            name: "Space".into(),
            state: ElementState::Pressed,
        }]);

        assert_eq!(host.poll_input(&mut input), HostControl::Continue);
        assert!(input.is_pressed_this_frame("space"));
        let snapshot = FrameSnapshot::default();
        assert_eq!(host.present(&snapshot).unwrap(), HostControl::Continue);

        assert_eq!(host.poll_input(&mut input), HostControl::Continue);
        assert!(!input.is_pressed_this_frame("space"));
        assert!(input.is_down("space"));
        assert_eq!(host.present(&snapshot).unwrap(), HostControl::Stop);
        assert_eq!(host.presented(), 2);
    }
}
