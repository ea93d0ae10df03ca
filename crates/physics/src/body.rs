//! Dimension abstraction and per-step body snapshots.

use engine_core::{math::unit_clamp, Component, ObjectId, Rigidbody};
use glam::{Vec2, Vec3};
use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

/// A vector type the solver can run on (`Vec2` for planar objects, `Vec3` for spatial).
pub trait PhysicsVector:
    Copy + Default + PartialEq + Debug + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self> + Neg<Output = Self>
{
    /// Whether this dimension serves 3D objects.
    const IS_3D: bool;
    const AXES: usize;

    fn axis(self, index: usize) -> f32;
    fn unit(index: usize) -> Self;
    fn dot_with(self, other: Self) -> f32;
    fn abs_components(self) -> Self;
    fn mul_components(self, other: Self) -> Self;
    fn all_finite(self) -> bool;
    fn from_vec3(v: Vec3) -> Self;
    fn to_vec3(self) -> Vec3;

    /// The rigid body of this dimension, if `component` is one.
    fn rigidbody(component: &Component) -> Option<&Rigidbody<Self>>;
    fn rigidbody_mut(component: &mut Component) -> Option<&mut Rigidbody<Self>>;
    /// Unscaled half extents of this dimension's box collider, if `component` is one.
    fn collider_half_extents(component: &Component) -> Option<Self>;
}

impl PhysicsVector for Vec2 {
    const IS_3D: bool = false;
    const AXES: usize = 2;

    fn axis(self, index: usize) -> f32 {
        self[index]
    }

    fn unit(index: usize) -> Self {
        Vec2::AXES[index]
    }

    fn dot_with(self, other: Self) -> f32 {
        self.dot(other)
    }

    fn abs_components(self) -> Self {
        self.abs()
    }

    fn mul_components(self, other: Self) -> Self {
        self * other
    }

    fn all_finite(self) -> bool {
        self.is_finite()
    }

    fn from_vec3(v: Vec3) -> Self {
        v.truncate()
    }

    fn to_vec3(self) -> Vec3 {
        self.extend(0.0)
    }

    fn rigidbody(component: &Component) -> Option<&Rigidbody<Self>> {
        match component {
            Component::Rigidbody2D(rb) => Some(rb),
            _ => None,
        }
    }

    fn rigidbody_mut(component: &mut Component) -> Option<&mut Rigidbody<Self>> {
        match component {
            Component::Rigidbody2D(rb) => Some(rb),
            _ => None,
        }
    }

    fn collider_half_extents(component: &Component) -> Option<Self> {
        match component {
            Component::BoxCollider2D(c) => Some(Vec2::new(c.width, c.height) * 0.5),
            _ => None,
        }
    }
}

impl PhysicsVector for Vec3 {
    const IS_3D: bool = true;
    const AXES: usize = 3;

    fn axis(self, index: usize) -> f32 {
        self[index]
    }

    fn unit(index: usize) -> Self {
        Vec3::AXES[index]
    }

    fn dot_with(self, other: Self) -> f32 {
        self.dot(other)
    }

    fn abs_components(self) -> Self {
        self.abs()
    }

    fn mul_components(self, other: Self) -> Self {
        self * other
    }

    fn all_finite(self) -> bool {
        self.is_finite()
    }

    fn from_vec3(v: Vec3) -> Self {
        v
    }

    fn to_vec3(self) -> Vec3 {
        self
    }

    fn rigidbody(component: &Component) -> Option<&Rigidbody<Self>> {
        match component {
            Component::Rigidbody3D(rb) => Some(rb),
            _ => None,
        }
    }

    fn rigidbody_mut(component: &mut Component) -> Option<&mut Rigidbody<Self>> {
        match component {
            Component::Rigidbody3D(rb) => Some(rb),
            _ => None,
        }
    }

    fn collider_half_extents(component: &Component) -> Option<Self> {
        match component {
            Component::BoxCollider3D(c) => Some(c.half_extents),
            _ => None,
        }
    }
}

/// A rigid body is usable for dynamics only with a finite, positive mass.
pub fn has_valid_mass<V>(body: &Rigidbody<V>) -> bool {
    body.mass.is_finite() && body.mass > 0.0
}

/// Advance one rigid body by `dt` with semi-implicit Euler. Returns the displacement.
///
/// Dynamic bodies accelerate from their continuous force and scaled gravity, then damp.
/// Non-dynamic bodies only drift by their own velocity.
pub fn integrate<V: PhysicsVector>(body: &mut Rigidbody<V>, gravity: V, dt: f32) -> V {
    if body.is_dynamic {
        let weight = gravity * (body.mass * body.gravity_scale);
        let acceleration = (body.force + weight) * (1.0 / body.mass);
        body.velocity = body.velocity + acceleration * dt;
        let damping = (1.0 - unit_clamp(body.linear_damping) * dt).max(0.0);
        body.velocity = body.velocity * damping;
    }
    body.velocity * dt
}

/// A collider-bearing object as the solver sees it during one step.
#[derive(Debug, Clone, Copy)]
pub struct BodyState<V> {
    pub id: ObjectId,
    pub center: V,
    pub half_extents: V,
    pub velocity: V,
    /// Zero for static, kinematic and collider-only objects.
    pub inverse_mass: f32,
    pub restitution: f32,
}

impl<V: PhysicsVector> BodyState<V> {
    pub fn is_dynamic(&self) -> bool {
        self.inverse_mass > 0.0
    }

    pub fn min(&self, axis: usize) -> f32 {
        self.center.axis(axis) - self.half_extents.axis(axis)
    }

    pub fn max(&self, axis: usize) -> f32 {
        self.center.axis(axis) + self.half_extents.axis(axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use engine_core::Rigidbody2D;

    #[test]
    fn dynamic_body_falls_under_gravity() {
        let mut rb = Rigidbody2D {
            linear_damping: 0.0,
            ..Default::default()
        };
        let moved = integrate(&mut rb, Vec2::new(0.0, -10.0), 0.1);
        assert_relative_eq!(rb.velocity.y, -1.0);
        // semi-implicit: position uses the updated velocity
        assert_relative_eq!(moved.y, -0.1);
    }

    #[test]
    fn kinematic_body_ignores_forces() {
        let mut rb = Rigidbody2D {
            is_dynamic: false,
            velocity: Vec2::new(2.0, 0.0),
            force: Vec2::new(100.0, 100.0),
            ..Default::default()
        };
        let moved = integrate(&mut rb, Vec2::new(0.0, -10.0), 0.5);
        assert_eq!(rb.velocity, Vec2::new(2.0, 0.0));
        assert_eq!(moved, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn continuous_force_and_gravity_scale() {
        let mut rb = Rigidbody2D {
            mass: 2.0,
            linear_damping: 0.0,
            gravity_scale: 0.0,
            force: Vec2::new(4.0, 0.0),
            ..Default::default()
        };
        integrate(&mut rb, Vec2::new(0.0, -10.0), 1.0);
        assert_relative_eq!(rb.velocity.x, 2.0);
        assert_relative_eq!(rb.velocity.y, 0.0);
    }

    #[test]
    fn mass_validation() {
        let mut rb = Rigidbody2D::default();
        assert!(has_valid_mass(&rb));
        rb.mass = 0.0;
        assert!(!has_valid_mass(&rb));
        rb.mass = f32::NAN;
        assert!(!has_valid_mass(&rb));
    }
}
