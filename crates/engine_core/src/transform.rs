//! Transform types and utilities for spatial positioning.

use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create the model matrix for this transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the right direction (positive X).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Y).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Translate the transform by a delta.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Rotation as yaw/pitch/roll Euler angles in degrees.
    pub fn euler_degrees(&self) -> Vec3 {
        let (yaw, pitch, roll) = self.rotation.to_euler(EulerRot::YXZ);
        Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
    }

    /// Set the rotation from Euler angles in degrees (x = pitch, y = yaw, z = roll).
    pub fn set_euler_degrees(&mut self, degrees: Vec3) {
        self.rotation = Quat::from_euler(
            EulerRot::YXZ,
            degrees.y.to_radians(),
            degrees.x.to_radians(),
            degrees.z.to_radians(),
        );
    }
}

/// A planar transform: position, rotation around Z in degrees, and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl Transform2D {
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Lift into a 3D transform on the z = 0 plane.
    pub fn to_3d(&self) -> Transform {
        Transform {
            position: self.position.extend(0.0),
            rotation: Quat::from_rotation_z(self.rotation.to_radians()),
            scale: self.scale.extend(1.0),
        }
    }
}

/// The transform carried by a scene object, matching its 2D/3D flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObjectTransform {
    Planar(Transform2D),
    Spatial(Transform),
}

impl ObjectTransform {
    /// Identity transform for a 2D or 3D object.
    pub fn identity(is_3d: bool) -> Self {
        if is_3d {
            Self::Spatial(Transform::default())
        } else {
            Self::Planar(Transform2D::default())
        }
    }

    pub fn is_3d(&self) -> bool {
        matches!(self, Self::Spatial(_))
    }

    /// Position lifted to 3D (z = 0 for planar objects).
    pub fn position3(&self) -> Vec3 {
        match self {
            Self::Planar(t) => t.position.extend(0.0),
            Self::Spatial(t) => t.position,
        }
    }

    /// Set the position from a 3D vector; planar objects keep x and y.
    pub fn set_position3(&mut self, position: Vec3) {
        match self {
            Self::Planar(t) => t.position = position.truncate(),
            Self::Spatial(t) => t.position = position,
        }
    }

    pub fn translate3(&mut self, delta: Vec3) {
        let position = self.position3() + delta;
        self.set_position3(position);
    }

    pub fn scale3(&self) -> Vec3 {
        match self {
            Self::Planar(t) => t.scale.extend(1.0),
            Self::Spatial(t) => t.scale,
        }
    }

    /// Full 3D transform, used for render hand-off.
    pub fn to_3d(&self) -> Transform {
        match self {
            Self::Planar(t) => t.to_3d(),
            Self::Spatial(t) => *t,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Self::Planar(t) => t.position.is_finite() && t.rotation.is_finite() && t.scale.is_finite(),
            Self::Spatial(t) => {
                t.position.is_finite() && t.rotation.is_finite() && t.scale.is_finite()
            }
        }
    }
}

/// Raw transform data for GPU upload (instance data).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
}

impl From<&Transform> for TransformRaw {
    fn from(transform: &Transform) -> Self {
        Self {
            model: transform.to_matrix().to_cols_array_2d(),
        }
    }
}

impl From<&ObjectTransform> for TransformRaw {
    fn from(transform: &ObjectTransform) -> Self {
        Self::from(&transform.to_3d())
    }
}
