//! The fixed-order frame.
//!
//! clock → input → scripts → behavior trees → physics → camera → present

use crate::{EngineError, EngineState, FrameHost, FrameSnapshot, FrameStats, HostControl};
use glam::Vec3;
use std::path::Path;

/// Advance the engine by one frame.
///
/// Returns `Stop` when the host or the engine asked to stop. Errors are fatal.
pub fn frame(state: &mut EngineState, host: &mut dyn FrameHost) -> Result<HostControl, EngineError> {
    // 1. clock
    match host.frame_delta() {
        Some(delta) => state.time.advance(delta),
        None => state.time.update(),
    }
    let dt = state.time.delta_seconds();
    let mut stats = FrameStats {
        frame: state.time.frame_count(),
        dt,
        paused: state.is_game_paused(),
        ..FrameStats::default()
    };

    // 2. input
    let control = host.poll_input(&mut state.services.input.borrow_mut());
    state.services.network.borrow_mut().update(dt);

    if !stats.paused {
        // 3. scripts
        stats.scripts = state.scripts.update(&state.scene, &state.services, dt);

        // 4. behavior trees
        stats.ai = state.behavior.tick(&mut state.scene.borrow_mut(), dt);

        // 5. physics
        state.physics.step(&mut state.scene.borrow_mut(), dt);
        stats.contacts = state.physics.contacts().len();
    }

    // 6. camera
    state.camera.update(&mut state.scene.borrow_mut(), dt);

    // 7. present
    let view = state.camera.view(&state.scene.borrow());
    if let Some(view) = &view {
        state.services.audio.borrow_mut().update_listener(view.position, view.forward(), Vec3::Y);
    }
    let snapshot = FrameSnapshot::capture(&state.scene.borrow(), stats.frame, dt, view);
    stats.render_items = snapshot.items.len();
    let presented = host.present(&snapshot)?;

    log::debug!(
        "Frame {}: dt={:.4} scripts={} ai={} contacts={} items={}",
        stats.frame,
        dt,
        stats.scripts.updated,
        stats.ai.ticked,
        stats.contacts,
        stats.render_items
    );
    state.last_stats = stats;

    if control == HostControl::Stop || presented == HostControl::Stop || state.stop_requested() {
        Ok(HostControl::Stop)
    } else {
        Ok(HostControl::Continue)
    }
}

/// Run frames until a stop is requested or an error surfaces. Returns the frame count.
pub fn run(state: &mut EngineState, host: &mut dyn FrameHost) -> Result<u64, EngineError> {
    let mut frames = 0;
    loop {
        let control = frame(state, host).map_err(|err| {
            log::error!("Frame loop halted: {}", err);
            err
        })?;
        frames += 1;
        if control == HostControl::Stop {
            log::info!("Frame loop stopped after {} frames", frames);
            return Ok(frames);
        }
    }
}

/// Run until stopped, save the scene if asked and shut down.
///
/// Shutdown happens on every path, so script cleanup hooks still run after a fatal frame.
pub fn run_session(state: &mut EngineState, host: &mut dyn FrameHost, save_to: Option<&Path>) -> Result<u64, EngineError> {
    let result = run(state, host).and_then(|frames| {
        if let Some(path) = save_to {
            state.save_scene(path)?;
        }
        Ok(frames)
    });
    state.shutdown();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, HeadlessHost};
    use approx::assert_relative_eq;
    use engine_core::{ComponentKind, PropertyValue};
    use input::{ElementState, InputEvent, InputState};
    use std::time::Duration;

    fn engine(editor_mode: bool) -> EngineState {
        EngineState::new(EngineConfig {
            editor_mode,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn stages_run_in_order_within_one_frame() {
        let mut state = engine(false);
        // the script sees the position before physics moves the body this frame
        state.scripts.register_source(
            "observer.rhai",
            r#"fn update(obj, dt) { obj.state.set("seen_y", obj.position.y); }"#,
        );
        let ball = state.create_object("Ball", false);
        state
            .add_component(
                ball,
                &ComponentKind::Rigidbody2D,
                [("linear_damping".to_string(), PropertyValue::Float(0.0))],
            )
            .unwrap();
        state
            .add_component(ball, &ComponentKind::Script, [("file".to_string(), PropertyValue::from("observer.rhai"))])
            .unwrap();

        let mut host = HeadlessHost::new(Duration::from_millis(100), Some(2));
        assert_eq!(run(&mut state, &mut host).unwrap(), 2);

        let y_after_one = -9.81 * 0.1 * 0.1;
        let seen = state.store().get("seen_y").and_then(|v| v.as_float().ok()).unwrap();
        assert_relative_eq!(seen, y_after_one, epsilon = 1e-5);
        assert!(state.scene().get(ball).unwrap().transform.position3().y < y_after_one);
        assert_eq!(state.last_stats.frame, 2);
        assert_eq!(state.last_stats.scripts.updated, 1);
    }

    #[test]
    fn frame_delta_is_clamped() {
        let mut state = engine(false);
        let mut host = HeadlessHost::new(Duration::from_secs(3), Some(1));
        frame(&mut state, &mut host).unwrap();
        assert_relative_eq!(state.last_stats.dt, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn editor_pause_skips_simulation_but_still_presents() {
        let mut state = engine(true);
        let ball = state.create_object("Ball", false);
        state.add_component(ball, &ComponentKind::Rigidbody2D, []).unwrap();
        state.set_paused(true);

        let mut host = HeadlessHost::new(Duration::from_millis(100), Some(3));
        run(&mut state, &mut host).unwrap();
        assert_eq!(host.presented(), 3);
        assert!(state.last_stats.paused);
        assert_eq!(state.scene().get(ball).unwrap().transform.position3().y, 0.0);
    }

    #[test]
    fn request_stop_ends_the_loop() {
        let mut state = engine(false);
        state.request_stop();
        let mut host = HeadlessHost::new(Duration::from_millis(16), None);
        assert_eq!(run(&mut state, &mut host).unwrap(), 1);
    }

    #[test]
    fn scripts_read_input_fed_this_frame() {
        let mut state = engine(false);
        state.scripts.register_source(
            "jump.rhai",
            r#"fn update(obj, dt) { if obj.input.is_pressed("space") { obj.state.set("jumped", true); } }"#,
        );
        let id = state.create_object("Player", false);
        state
            .add_component(id, &ComponentKind::Script, [("file".to_string(), PropertyValue::from("jump.rhai"))])
            .unwrap();

        let mut host = HeadlessHost::new(Duration::from_millis(16), Some(1));
        host.queue_input(vec![InputEvent::Key {
            name: "space".into(),
            state: ElementState::Pressed,
        }]);
        run(&mut state, &mut host).unwrap();
        assert!(state.store().contains("jumped"));
    }

    #[test]
    fn scripts_drain_network_messages_every_frame() {
        let mut state = engine(false);
        state.scripts.register_source(
            "chat.rhai",
            r#"
                fn init(obj) {
                    obj.network.start_host();
                    obj.state.set("received", 0);
                }
                fn update(obj, dt) {
                    obj.network.send("tick", "x");
                    obj.state.set("received", obj.state.get("received") + obj.network.receive().len());
                }
            "#,
        );
        let id = state.create_object("Peer", false);
        state
            .add_component(id, &ComponentKind::Script, [("file".to_string(), PropertyValue::from("chat.rhai"))])
            .unwrap();

        let mut host = HeadlessHost::new(Duration::from_millis(100), Some(10));
        run(&mut state, &mut host).unwrap();
        // a message sent in one frame is flushed and received on the next
        let received = state.store().get("received").and_then(|v| v.as_int().ok());
        assert_eq!(received, Some(8));
        assert_eq!(state.network().pending(), 0);
    }

    struct FailingHost;

    impl FrameHost for FailingHost {
        fn poll_input(&mut self, _input: &mut InputState) -> HostControl {
            HostControl::Continue
        }

        fn present(&mut self, _snapshot: &FrameSnapshot) -> Result<HostControl, EngineError> {
            Err(EngineError::Fatal("surface lost".into()))
        }
    }

    #[test]
    fn host_failure_halts_the_loop() {
        let mut state = engine(false);
        assert!(matches!(run(&mut state, &mut FailingHost), Err(EngineError::Fatal(_))));
    }

    #[test]
    fn failed_session_still_shuts_down() {
        let mut state = engine(false);
        state
            .scripts
            .register_source("tidy.rhai", r#"fn cleanup(obj) { obj.state.set("tidied", true); }"#);
        let id = state.create_object("Tidy", false);
        state
            .add_component(id, &ComponentKind::Script, [("file".to_string(), PropertyValue::from("tidy.rhai"))])
            .unwrap();
        state.scripts.update(&state.scene, &state.services.clone(), 0.1);

        assert!(run_session(&mut state, &mut FailingHost, None).is_err());
        assert!(state.store().contains("tidied"));
        assert_eq!(state.scripts.binding_count(), 0);
        assert!(state.all_objects().is_empty());
    }
}
