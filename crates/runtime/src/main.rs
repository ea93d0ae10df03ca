//! Headless scene runner.
//!
//! Usage: scene_runtime [scene.ron] [--frames N] [--save out.ron]

use anyhow::{bail, Context, Result};
use engine_core::{ComponentKind, PropertyValue, Vec2};
use runtime::{run_session, EngineConfig, EngineState, HeadlessHost};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_FRAMES: u64 = 600;
const FIXED_DT: Duration = Duration::from_micros(16_667);

const PLAYER_SCRIPT: &str = r#"
fn init(obj) {
    this.speed = 60.0;
    obj.log("player ready");
}

fn update(obj, dt) {
    let m = obj.input.movement;
    obj.translate(vec2(m.x, m.y) * this.speed * dt);
}
"#;

struct Args {
    scene: Option<PathBuf>,
    frames: u64,
    save: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        scene: None,
        frames: DEFAULT_FRAMES,
        save: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--frames" => {
                let value = iter.next().context("--frames needs a value")?;
                args.frames = value.parse().with_context(|| format!("invalid frame count '{value}'"))?;
            }
            "--save" => args.save = Some(iter.next().context("--save needs a path")?.into()),
            other if other.starts_with("--") => bail!("unknown option {other}"),
            other => args.scene = Some(other.into()),
        }
    }
    Ok(args)
}

fn props<const N: usize>(pairs: [(&str, PropertyValue); N]) -> Vec<(String, PropertyValue)> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Ground, a falling crate, a player, a guard chasing the player and a following camera.
fn build_demo_scene(state: &mut EngineState) -> Result<()> {
    state.new_scene("Demo");
    state.scripts.register_source("player.rhai", PLAYER_SCRIPT);

    let ground = state.create_object("Ground", false);
    state.scene_mut().require_mut(ground)?.transform.set_position3(Vec2::new(0.0, -100.0).extend(0.0));
    state.add_component(
        ground,
        &ComponentKind::BoxCollider2D,
        props([("width", PropertyValue::Float(800.0)), ("height", PropertyValue::Float(20.0))]),
    )?;

    let crate_id = state.create_object("Crate", false);
    state.scene_mut().require_mut(crate_id)?.transform.set_position3(Vec2::new(40.0, 50.0).extend(0.0));
    state.add_component(crate_id, &ComponentKind::Rigidbody2D, props([("mass", PropertyValue::Float(2.0))]))?;
    state.add_component(
        crate_id,
        &ComponentKind::BoxCollider2D,
        props([("width", PropertyValue::Float(10.0)), ("height", PropertyValue::Float(10.0))]),
    )?;
    state.add_component(
        crate_id,
        &ComponentKind::SpriteRenderer,
        props([("asset", PropertyValue::from("crate.png")), ("layer", PropertyValue::Int(1))]),
    )?;

    let player = state.create_object("Player", false);
    state.add_component(player, &ComponentKind::Script, props([("file", PropertyValue::from("player.rhai"))]))?;
    state.add_component(
        player,
        &ComponentKind::SpriteRenderer,
        props([("asset", PropertyValue::from("player.png")), ("layer", PropertyValue::Int(2))]),
    )?;

    let guard = state.create_object("Guard", false);
    state.scene_mut().require_mut(guard)?.transform.set_position3(Vec2::new(150.0, 0.0).extend(0.0));
    state.add_component(
        guard,
        &ComponentKind::BehaviorTree,
        props([
            ("tree_name", PropertyValue::from("DefaultAI")),
            ("target", PropertyValue::from("Player")),
        ]),
    )?;
    state.add_component(
        guard,
        &ComponentKind::SpriteRenderer,
        props([("asset", PropertyValue::from("guard.png")), ("layer", PropertyValue::Int(2))]),
    )?;

    let camera = state.create_object("MainCamera", false);
    state.add_component(
        camera,
        &ComponentKind::Camera,
        props([
            ("is_active", PropertyValue::Bool(true)),
            ("follow_target", PropertyValue::from("Player")),
            ("follow_speed", PropertyValue::Float(2.0)),
        ]),
    )?;

    log::info!("Built demo scene with {} objects", state.all_objects().len());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let config = EngineConfig::load();
    let mut state = EngineState::new(config)?;

    match &args.scene {
        Some(path) => state
            .load_scene(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => build_demo_scene(&mut state)?,
    }

    let mut host = HeadlessHost::new(FIXED_DT, Some(args.frames));
    let frames = run_session(&mut state, &mut host, args.save.as_deref())?;
    log::info!(
        "Ran {} frames, {} render items in the last one",
        frames,
        state.last_stats.render_items
    );
    Ok(())
}
