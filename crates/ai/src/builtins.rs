//! Stock conditions, actions and trees every manager starts with.

use crate::{BehaviorTreeManager, BtContext, NodeDef, NodeStatus};
use engine_core::{PropertyValue, Vec3};

pub const PATROL_SPEED: f32 = 50.0;
pub const CHASE_SPEED: f32 = 80.0;
pub const FLEE_SPEED: f32 = 50.0;
/// Half-width of the patrol strip around where the object started patrolling.
pub const PATROL_RANGE: f32 = 200.0;
pub const NEAR_DISTANCE: f32 = 100.0;
pub const TOO_CLOSE_DISTANCE: f32 = 30.0;

pub const DEFAULT_TREE: &str = "DefaultAI";
pub const PATROL_TREE: &str = "PatrolOnly";

/// Register the stock leaves and trees.
pub fn install(manager: &mut BehaviorTreeManager) {
    manager.register_condition("HasTarget", |ctx| Ok(ctx.target_position().is_some()));
    manager.register_condition("IsTargetNear", |ctx| {
        let limit = ctx.state.get_f32("near_distance").unwrap_or(NEAR_DISTANCE);
        Ok(ctx.distance_to_target()?.is_some_and(|d| d < limit))
    });
    manager.register_condition("IsTargetTooClose", |ctx| {
        let limit = ctx.state.get_f32("flee_distance").unwrap_or(TOO_CLOSE_DISTANCE);
        Ok(ctx.distance_to_target()?.is_some_and(|d| d < limit))
    });

    manager.register_action("Patrol", patrol);
    manager.register_action("ChaseTarget", |ctx| pursue(ctx, CHASE_SPEED));
    manager.register_action("FleeTarget", |ctx| pursue(ctx, -FLEE_SPEED));
    manager.register_action("Idle", |ctx| {
        ctx.stop()?;
        Ok(NodeStatus::Running)
    });

    manager.register_tree(
        DEFAULT_TREE,
        NodeDef::selector(vec![
            NodeDef::sequence(vec![NodeDef::condition("IsTargetTooClose"), NodeDef::action("FleeTarget")]),
            NodeDef::sequence(vec![NodeDef::condition("IsTargetNear"), NodeDef::action("ChaseTarget")]),
            NodeDef::action("Patrol"),
        ]),
    );
    manager.register_tree(PATROL_TREE, NodeDef::sequence(vec![NodeDef::action("Patrol")]));
}

/// Walk back and forth along x. Direction and origin live on the blackboard.
fn patrol(ctx: &mut BtContext) -> Result<NodeStatus, crate::AiError> {
    let position = ctx.position()?;
    let origin = match ctx.state.get_f32("patrol_origin") {
        Some(origin) => origin,
        None => {
            ctx.state.set("patrol_origin", position.x);
            position.x
        }
    };
    let range = ctx.state.get_f32("patrol_range").unwrap_or(PATROL_RANGE);

    let mut direction = match ctx.state.get("move_dir") {
        Some(PropertyValue::Int(d)) if *d < 0 => -1,
        _ => 1,
    };
    if position.x > origin + range {
        direction = -1;
    } else if position.x < origin - range {
        direction = 1;
    }
    ctx.state.set("move_dir", PropertyValue::Int(direction));

    ctx.move_along(Vec3::X * direction as f32, PATROL_SPEED)?;
    Ok(NodeStatus::Running)
}

/// Move toward the target, or away from it for a negative speed.
fn pursue(ctx: &mut BtContext, speed: f32) -> Result<NodeStatus, crate::AiError> {
    let Some(target) = ctx.target_position() else {
        return Ok(NodeStatus::Failure);
    };
    let direction = (target - ctx.position()?).normalize_or_zero();
    ctx.move_along(direction, speed)?;
    Ok(NodeStatus::Running)
}
