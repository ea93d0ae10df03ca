//! Broad phase, narrow phase and impulse resolution for axis-aligned boxes.

use crate::{BodyState, PhysicsVector};
use engine_core::ObjectId;
use glam::Vec3;

/// A touching pair found in the last step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub a: ObjectId,
    pub b: ObjectId,
    /// Unit normal pointing from `a` towards `b`.
    pub normal: Vec3,
    pub penetration: f32,
}

impl Contact {
    pub fn involves(&self, id: ObjectId) -> bool {
        self.a == id || self.b == id
    }
}

/// Candidate pairs whose extents overlap on the x axis (sort and sweep).
///
/// Returned pairs index into `bodies` and are ordered by the sweep, lower index first.
pub fn sweep_and_prune<V: PhysicsVector>(bodies: &[BodyState<V>]) -> Vec<(usize, usize)> {
    let mut sorted: Vec<usize> = (0..bodies.len()).collect();
    sorted.sort_by(|&a, &b| bodies[a].min(0).total_cmp(&bodies[b].min(0)));

    let mut pairs = Vec::new();
    let mut active: Vec<usize> = Vec::new();
    for &index in &sorted {
        let min_x = bodies[index].min(0);
        active.retain(|&other| bodies[other].max(0) > min_x);
        for &other in &active {
            pairs.push((other.min(index), other.max(index)));
        }
        active.push(index);
    }
    pairs
}

/// Overlap test between two boxes.
///
/// Returns the normal (from `a` to `b`) along the axis of minimum penetration and the
/// penetration depth, or `None` when the boxes are separated or merely touching.
pub fn aabb_overlap<V: PhysicsVector>(a: &BodyState<V>, b: &BodyState<V>) -> Option<(V, f32)> {
    let delta = b.center - a.center;
    let mut best: Option<(usize, f32)> = None;
    for axis in 0..V::AXES {
        let overlap = a.half_extents.axis(axis) + b.half_extents.axis(axis) - delta.axis(axis).abs();
        if overlap <= 0.0 {
            return None;
        }
        if best.map_or(true, |(_, depth)| overlap < depth) {
            best = Some((axis, overlap));
        }
    }
    let (axis, depth) = best?;
    let sign = if delta.axis(axis) < 0.0 { -1.0 } else { 1.0 };
    Some((V::unit(axis) * sign, depth))
}

/// Separate two overlapping bodies and reflect their approach velocity.
///
/// Correction is split by inverse mass, so a static side never moves. The bounce
/// coefficient is the smaller restitution for dynamic pairs and the dynamic side's
/// restitution against static geometry.
pub fn resolve_contact<V: PhysicsVector>(a: &mut BodyState<V>, b: &mut BodyState<V>, normal: V, penetration: f32) {
    let total = a.inverse_mass + b.inverse_mass;
    if total <= 0.0 {
        return;
    }

    a.center = a.center - normal * (penetration * a.inverse_mass / total);
    b.center = b.center + normal * (penetration * b.inverse_mass / total);

    let approach = (b.velocity - a.velocity).dot_with(normal);
    if approach >= 0.0 {
        return;
    }
    let restitution = match (a.is_dynamic(), b.is_dynamic()) {
        (true, true) => a.restitution.min(b.restitution),
        (true, false) => a.restitution,
        _ => b.restitution,
    };
    let impulse = -(1.0 + restitution) * approach / total;
    a.velocity = a.velocity - normal * (impulse * a.inverse_mass);
    b.velocity = b.velocity + normal * (impulse * b.inverse_mass);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec2;

    fn body(id: u64, x: f32, y: f32, inverse_mass: f32) -> BodyState<Vec2> {
        BodyState {
            id: ObjectId(id),
            center: Vec2::new(x, y),
            half_extents: Vec2::splat(0.5),
            velocity: Vec2::ZERO,
            inverse_mass,
            restitution: 0.0,
        }
    }

    #[test]
    fn sweep_finds_only_x_overlaps() {
        let bodies = vec![body(1, 0.0, 0.0, 1.0), body(2, 0.8, 5.0, 1.0), body(3, 3.0, 0.0, 1.0)];
        let pairs = sweep_and_prune(&bodies);
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn overlap_picks_minimum_penetration_axis() {
        let a = body(1, 0.0, 0.0, 1.0);
        let b = body(2, 0.2, 0.9, 1.0);
        let (normal, depth) = aabb_overlap(&a, &b).unwrap();
        assert_eq!(normal, Vec2::Y);
        assert_relative_eq!(depth, 0.1, epsilon = 1e-5);

        let c = body(3, 1.0, 0.0, 1.0);
        assert!(aabb_overlap(&a, &c).is_none(), "touching boxes do not overlap");
    }

    #[test]
    fn static_side_never_moves() {
        let mut floor = body(1, 0.0, 0.0, 0.0);
        let mut ball = body(2, 0.0, 0.8, 1.0);
        ball.velocity = Vec2::new(0.0, -4.0);
        ball.restitution = 0.5;

        let (normal, depth) = aabb_overlap(&floor, &ball).unwrap();
        resolve_contact(&mut floor, &mut ball, normal, depth);

        assert_eq!(floor.center, Vec2::ZERO);
        assert_relative_eq!(ball.center.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(ball.velocity.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn dynamic_pair_splits_by_inverse_mass() {
        let mut heavy = body(1, 0.0, 0.0, 0.5);
        let mut light = body(2, 0.7, 0.0, 1.5);
        let (normal, depth) = aabb_overlap(&heavy, &light).unwrap();
        resolve_contact(&mut heavy, &mut light, normal, depth);
        assert_relative_eq!(heavy.center.x, -0.075, epsilon = 1e-5);
        assert_relative_eq!(light.center.x, 0.925, epsilon = 1e-5);
    }

    #[test]
    fn static_pairs_are_untouched() {
        let mut a = body(1, 0.0, 0.0, 0.0);
        let mut b = body(2, 0.5, 0.0, 0.0);
        resolve_contact(&mut a, &mut b, Vec2::X, 0.5);
        assert_eq!(a.center, Vec2::ZERO);
        assert_eq!(b.center, Vec2::new(0.5, 0.0));
    }
}
