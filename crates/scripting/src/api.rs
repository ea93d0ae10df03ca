//! The Rhai-facing API: value types, the scene object sandbox and service handles.

use crate::convert::{from_dynamic, to_dynamic};
use crate::ScriptSandbox;
use engine_core::{Color, ComponentKind, ObjectTransform, Timer};
use glam::{Vec2, Vec3};
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Map, FLOAT, INT};

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

fn fault(err: impl std::fmt::Display) -> Box<EvalAltResult> {
    err.to_string().into()
}

/// A live reference to one component of a scene object.
///
/// Property reads and writes go straight to the scene, so several handles to the same
/// component always agree.
#[derive(Clone)]
pub struct ComponentHandle {
    sandbox: ScriptSandbox,
    kind: ComponentKind,
    ordinal: usize,
}

impl ComponentHandle {
    fn get(&mut self, name: &str) -> RhaiResult<Dynamic> {
        let value = self.sandbox.property(&self.kind, self.ordinal, name).map_err(fault)?;
        Ok(to_dynamic(&value))
    }

    fn set(&mut self, name: &str, value: Dynamic) -> RhaiResult<()> {
        let value = from_dynamic(value).map_err(|found| fault(format!("cannot store a {found} in {}.{name}", self.kind)))?;
        self.sandbox
            .set_property(&self.kind, self.ordinal, name, value)
            .map_err(fault)
    }
}

fn component_handle(sandbox: &ScriptSandbox, kind: &str, ordinal: usize) -> RhaiResult<Dynamic> {
    let kind = ComponentKind::from_name(kind);
    let count = sandbox.with_object(|o| o.count_components(&kind)).map_err(fault)?;
    if ordinal >= count {
        return Ok(Dynamic::UNIT);
    }
    Ok(Dynamic::from(ComponentHandle {
        sandbox: sandbox.clone(),
        kind,
        ordinal,
    }))
}

/// Read-only view of the input snapshot.
#[derive(Clone)]
pub struct InputHandle(ScriptSandbox);

/// Playback requests.
#[derive(Clone)]
pub struct AudioHandle(ScriptSandbox);

/// The session-wide store.
#[derive(Clone)]
pub struct StoreHandle(ScriptSandbox);

/// Network session commands.
#[derive(Clone)]
pub struct NetworkHandle(ScriptSandbox);

/// Register every type and function scripts can use.
pub fn register_api(engine: &mut Engine) {
    register_math(engine);
    register_timer(engine);
    register_object(engine);
    register_component(engine);
    register_services(engine);

    engine.register_fn("log", |message: &str| log::info!("[script] {}", message));
    engine.register_fn("log_warn", |message: &str| log::warn!("[script] {}", message));
}

fn register_math(engine: &mut Engine) {
    engine
        .register_type_with_name::<Vec2>("Vec2")
        .register_fn("vec2", |x: FLOAT, y: FLOAT| Vec2::new(x, y))
        .register_fn("vec2", |x: INT, y: INT| Vec2::new(x as FLOAT, y as FLOAT))
        .register_get_set("x", |v: &mut Vec2| v.x, |v: &mut Vec2, x: FLOAT| v.x = x)
        .register_get_set("y", |v: &mut Vec2| v.y, |v: &mut Vec2, y: FLOAT| v.y = y)
        .register_fn("+", |a: Vec2, b: Vec2| a + b)
        .register_fn("-", |a: Vec2, b: Vec2| a - b)
        .register_fn("-", |a: Vec2| -a)
        .register_fn("*", |a: Vec2, s: FLOAT| a * s)
        .register_fn("*", |s: FLOAT, a: Vec2| a * s)
        .register_fn("/", |a: Vec2, s: FLOAT| a / s)
        .register_fn("==", |a: Vec2, b: Vec2| a == b)
        .register_fn("length", |v: &mut Vec2| v.length())
        .register_fn("normalized", |v: &mut Vec2| v.normalize_or_zero())
        .register_fn("dot", |a: Vec2, b: Vec2| a.dot(b))
        .register_fn("distance", |a: Vec2, b: Vec2| a.distance(b))
        .register_fn("extend", |v: &mut Vec2, z: FLOAT| v.extend(z))
        .register_fn("to_string", |v: &mut Vec2| format!("vec2({}, {})", v.x, v.y))
        .register_fn("to_debug", |v: &mut Vec2| format!("vec2({}, {})", v.x, v.y));

    engine
        .register_type_with_name::<Vec3>("Vec3")
        .register_fn("vec3", |x: FLOAT, y: FLOAT, z: FLOAT| Vec3::new(x, y, z))
        .register_fn("vec3", |x: INT, y: INT, z: INT| Vec3::new(x as FLOAT, y as FLOAT, z as FLOAT))
        .register_get_set("x", |v: &mut Vec3| v.x, |v: &mut Vec3, x: FLOAT| v.x = x)
        .register_get_set("y", |v: &mut Vec3| v.y, |v: &mut Vec3, y: FLOAT| v.y = y)
        .register_get_set("z", |v: &mut Vec3| v.z, |v: &mut Vec3, z: FLOAT| v.z = z)
        .register_fn("+", |a: Vec3, b: Vec3| a + b)
        .register_fn("-", |a: Vec3, b: Vec3| a - b)
        .register_fn("-", |a: Vec3| -a)
        .register_fn("*", |a: Vec3, s: FLOAT| a * s)
        .register_fn("*", |s: FLOAT, a: Vec3| a * s)
        .register_fn("/", |a: Vec3, s: FLOAT| a / s)
        .register_fn("==", |a: Vec3, b: Vec3| a == b)
        .register_fn("length", |v: &mut Vec3| v.length())
        .register_fn("normalized", |v: &mut Vec3| v.normalize_or_zero())
        .register_fn("dot", |a: Vec3, b: Vec3| a.dot(b))
        .register_fn("cross", |a: Vec3, b: Vec3| a.cross(b))
        .register_fn("distance", |a: Vec3, b: Vec3| a.distance(b))
        .register_fn("truncate", |v: &mut Vec3| v.truncate())
        .register_fn("to_string", |v: &mut Vec3| format!("vec3({}, {}, {})", v.x, v.y, v.z))
        .register_fn("to_debug", |v: &mut Vec3| format!("vec3({}, {}, {})", v.x, v.y, v.z));

    engine
        .register_type_with_name::<Color>("Color")
        .register_fn("rgba", |r: FLOAT, g: FLOAT, b: FLOAT, a: FLOAT| Color::rgba(r, g, b, a))
        .register_fn("color", |hex: &str| -> RhaiResult<Color> {
            Color::from_hex(hex).ok_or_else(|| fault(format!("invalid color '{hex}'")))
        })
        .register_get_set("r", |c: &mut Color| c.r, |c: &mut Color, v: FLOAT| c.r = v)
        .register_get_set("g", |c: &mut Color| c.g, |c: &mut Color, v: FLOAT| c.g = v)
        .register_get_set("b", |c: &mut Color| c.b, |c: &mut Color, v: FLOAT| c.b = v)
        .register_get_set("a", |c: &mut Color| c.a, |c: &mut Color, v: FLOAT| c.a = v)
        .register_fn("lerp", |a: &mut Color, b: Color, t: FLOAT| a.lerp(b, t))
        .register_fn("to_string", |c: &mut Color| c.to_hex());
}

fn register_timer(engine: &mut Engine) {
    engine
        .register_type_with_name::<Timer>("Timer")
        .register_fn("timer", |duration: FLOAT, looping: bool| Timer::new(duration, looping))
        .register_fn("timer", |duration: FLOAT| Timer::new(duration, false))
        .register_fn("tick", |t: &mut Timer, dt: FLOAT| t.tick(dt))
        .register_fn("start", |t: &mut Timer| t.start())
        .register_fn("pause", |t: &mut Timer| t.pause())
        .register_fn("resume", |t: &mut Timer| t.resume())
        .register_fn("reset", |t: &mut Timer| t.reset())
        .register_get("elapsed", |t: &mut Timer| t.elapsed())
        .register_get("duration", |t: &mut Timer| t.duration())
        .register_get("ratio", |t: &mut Timer| t.ratio())
        .register_get("running", |t: &mut Timer| t.is_running())
        .register_get("finished", |t: &mut Timer| t.is_finished());
}

fn register_object(engine: &mut Engine) {
    engine
        .register_type_with_name::<ScriptSandbox>("SceneObject")
        .register_get("id", |o: &mut ScriptSandbox| o.id().raw() as INT)
        .register_get("name", |o: &mut ScriptSandbox| o.name().map_err(fault))
        .register_get("is_3d", |o: &mut ScriptSandbox| o.is_3d().map_err(fault))
        .register_get("alive", |o: &mut ScriptSandbox| o.is_live())
        .register_get_set(
            "position",
            |o: &mut ScriptSandbox| -> RhaiResult<Dynamic> {
                Ok(match o.transform().map_err(fault)? {
                    ObjectTransform::Planar(t) => Dynamic::from(t.position),
                    ObjectTransform::Spatial(t) => Dynamic::from(t.position),
                })
            },
            |o: &mut ScriptSandbox, value: Dynamic| -> RhaiResult<()> {
                let position = vector3(value, "position")?;
                o.set_position(position).map_err(fault)
            },
        )
        .register_get_set(
            "rotation",
            |o: &mut ScriptSandbox| -> RhaiResult<Dynamic> {
                Ok(match o.transform().map_err(fault)? {
                    ObjectTransform::Planar(t) => Dynamic::from_float(t.rotation),
                    ObjectTransform::Spatial(t) => Dynamic::from(t.euler_degrees()),
                })
            },
            |o: &mut ScriptSandbox, value: Dynamic| -> RhaiResult<()> {
                let mut transform = o.transform().map_err(fault)?;
                match &mut transform {
                    ObjectTransform::Planar(t) => {
                        t.rotation = number(&value).ok_or_else(|| fault("2D rotation must be a number (degrees)"))?;
                    }
                    ObjectTransform::Spatial(t) => {
                        let degrees = value
                            .try_cast::<Vec3>()
                            .ok_or_else(|| fault("3D rotation must be a Vec3 of euler degrees"))?;
                        t.set_euler_degrees(degrees);
                    }
                }
                o.set_transform(transform).map_err(fault)
            },
        )
        .register_get_set(
            "scale",
            |o: &mut ScriptSandbox| -> RhaiResult<Dynamic> {
                Ok(match o.transform().map_err(fault)? {
                    ObjectTransform::Planar(t) => Dynamic::from(t.scale),
                    ObjectTransform::Spatial(t) => Dynamic::from(t.scale),
                })
            },
            |o: &mut ScriptSandbox, value: Dynamic| -> RhaiResult<()> {
                let mut transform = o.transform().map_err(fault)?;
                match &mut transform {
                    ObjectTransform::Planar(t) => {
                        t.scale = value.try_cast::<Vec2>().ok_or_else(|| fault("2D scale must be a Vec2"))?;
                    }
                    ObjectTransform::Spatial(t) => {
                        t.scale = value.try_cast::<Vec3>().ok_or_else(|| fault("3D scale must be a Vec3"))?;
                    }
                }
                o.set_transform(transform).map_err(fault)
            },
        )
        .register_fn("translate", |o: &mut ScriptSandbox, delta: Dynamic| -> RhaiResult<()> {
            let delta = vector3(delta, "translate")?;
            o.translate(delta).map_err(fault)
        })
        .register_fn("get_component", |o: &mut ScriptSandbox, kind: &str| component_handle(o, kind, 0))
        .register_fn("get_component", |o: &mut ScriptSandbox, kind: &str, index: INT| {
            component_handle(o, kind, index.max(0) as usize)
        })
        .register_fn("has_component", |o: &mut ScriptSandbox, kind: &str| {
            o.has_component(&ComponentKind::from_name(kind)).map_err(fault)
        })
        .register_fn("find_object", |o: &mut ScriptSandbox, name_or_id: &str| {
            o.find_object(name_or_id).map(Dynamic::from).unwrap_or(Dynamic::UNIT)
        })
        .register_fn("find_object", |o: &mut ScriptSandbox, id: INT| {
            o.find_object(&id.to_string()).map(Dynamic::from).unwrap_or(Dynamic::UNIT)
        })
        .register_get("input", |o: &mut ScriptSandbox| InputHandle(o.clone()))
        .register_get("audio", |o: &mut ScriptSandbox| AudioHandle(o.clone()))
        .register_get("state", |o: &mut ScriptSandbox| StoreHandle(o.clone()))
        .register_get("network", |o: &mut ScriptSandbox| NetworkHandle(o.clone()))
        .register_fn("log", |o: &mut ScriptSandbox, message: &str| {
            let name = o.name().unwrap_or_else(|_| o.id().to_string());
            log::info!("[{}] {}", name, message);
        })
        .register_fn("to_string", |o: &mut ScriptSandbox| {
            format!("{}({})", o.name().unwrap_or_default(), o.id())
        });
}

fn register_component(engine: &mut Engine) {
    engine
        .register_type_with_name::<ComponentHandle>("Component")
        .register_get("kind", |c: &mut ComponentHandle| c.kind.name().to_string())
        .register_indexer_get_set(
            |c: &mut ComponentHandle, name: ImmutableString| c.get(&name),
            |c: &mut ComponentHandle, name: ImmutableString, value: Dynamic| c.set(&name, value),
        )
        .register_fn("get", |c: &mut ComponentHandle, name: &str| c.get(name))
        .register_fn("set", |c: &mut ComponentHandle, name: &str, value: Dynamic| c.set(name, value));
}

fn register_services(engine: &mut Engine) {
    engine
        .register_type_with_name::<InputHandle>("Input")
        .register_fn("is_down", |i: &mut InputHandle, key: &str| i.0.input().is_down(key))
        .register_fn("is_pressed", |i: &mut InputHandle, key: &str| i.0.input().is_pressed_this_frame(key))
        .register_fn("is_released", |i: &mut InputHandle, key: &str| i.0.input().is_released_this_frame(key))
        .register_fn("axis", |i: &mut InputHandle, name: &str| i.0.input().axis(name))
        .register_fn("mouse_button", |i: &mut InputHandle, button: INT| {
            input::MouseButton::from_index(button).is_some_and(|b| i.0.input().is_mouse_held(b))
        })
        .register_get("mouse_position", |i: &mut InputHandle| i.0.input().mouse_position())
        .register_get("mouse_delta", |i: &mut InputHandle| i.0.input().mouse_delta())
        .register_get("movement", |i: &mut InputHandle| i.0.input().movement());

    engine
        .register_type_with_name::<AudioHandle>("Audio")
        .register_fn("play", |a: &mut AudioHandle, name: &str| a.0.audio().play_sound(name, 1.0))
        .register_fn("play", |a: &mut AudioHandle, name: &str, volume: FLOAT| {
            a.0.audio().play_sound(name, volume as f64)
        })
        .register_fn("play_here", |a: &mut AudioHandle, name: &str| -> RhaiResult<bool> {
            let position = a.0.position().map_err(fault)?;
            Ok(a.0.audio().play_sound_at(name, 1.0, position))
        })
        .register_get_set(
            "master_volume",
            |a: &mut AudioHandle| a.0.audio().master_volume() as FLOAT,
            |a: &mut AudioHandle, volume: FLOAT| a.0.audio().set_master_volume(volume as f64),
        );

    engine
        .register_type_with_name::<StoreHandle>("State")
        .register_fn("get", |s: &mut StoreHandle, key: &str| s.0.store().get(key).unwrap_or(Dynamic::UNIT))
        .register_fn("set", |s: &mut StoreHandle, key: &str, value: Dynamic| s.0.store().set(key, value))
        .register_fn("has", |s: &mut StoreHandle, key: &str| s.0.store().contains(key))
        .register_fn("remove", |s: &mut StoreHandle, key: &str| s.0.store().remove(key).unwrap_or(Dynamic::UNIT))
        .register_indexer_get_set(
            |s: &mut StoreHandle, key: ImmutableString| s.0.store().get(&key).unwrap_or(Dynamic::UNIT),
            |s: &mut StoreHandle, key: ImmutableString, value: Dynamic| s.0.store().set(key.as_str(), value),
        );

    engine
        .register_type_with_name::<NetworkHandle>("Network")
        .register_fn("start_host", |n: &mut NetworkHandle| n.0.network().start_host(None, None))
        .register_fn("start_host", |n: &mut NetworkHandle, host: &str, port: INT| {
            n.0.network().start_host(Some(host), u16::try_from(port).ok())
        })
        .register_fn("start_client", |n: &mut NetworkHandle, host: &str, port: INT| {
            n.0.network().start_client(Some(host), u16::try_from(port).ok())
        })
        .register_fn("stop", |n: &mut NetworkHandle| n.0.network().stop())
        .register_fn("send", |n: &mut NetworkHandle, channel: &str, payload: &str| n.0.network().send(channel, payload))
        .register_get("is_hosting", |n: &mut NetworkHandle| n.0.network().is_hosting())
        .register_get("is_client", |n: &mut NetworkHandle| n.0.network().is_client())
        .register_fn("receive", |n: &mut NetworkHandle| -> Array {
            n.0.network()
                .take_messages()
                .into_iter()
                .map(|message| {
                    let mut entry = Map::new();
                    entry.insert("channel".into(), message.channel.into());
                    entry.insert("payload".into(), message.payload.into());
                    Dynamic::from_map(entry)
                })
                .collect()
        });
}

fn number(value: &Dynamic) -> Option<FLOAT> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|v| v as FLOAT))
}

/// Accept a `Vec2` (z = 0) or a `Vec3` where a 3D vector is expected.
fn vector3(value: Dynamic, what: &str) -> RhaiResult<Vec3> {
    if value.is::<Vec3>() {
        return Ok(value.cast::<Vec3>());
    }
    if value.is::<Vec2>() {
        return Ok(value.cast::<Vec2>().extend(0.0));
    }
    Err(fault(format!("{what} expects a Vec2 or Vec3, got {}", value.type_name())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScriptServices, SharedScene};
    use engine_core::PropertyValue;
    use rhai::Scope;
    use scene::SceneGraph;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn run(script: &str, scene: &SharedScene, services: &ScriptServices, id: engine_core::ObjectId) -> RhaiResult<Dynamic> {
        let mut engine = Engine::new();
        register_api(&mut engine);
        let mut scope = Scope::new();
        scope.push("obj", ScriptSandbox::new(id, scene.clone(), services.clone()));
        engine.eval_with_scope::<Dynamic>(&mut scope, script)
    }

    fn setup() -> (SharedScene, ScriptServices, engine_core::ObjectId) {
        let mut graph = SceneGraph::new("Test");
        let id = graph.create_object("Hero", false);
        graph
            .get_mut(id)
            .unwrap()
            .add_component(&ComponentKind::Rigidbody2D, [])
            .unwrap();
        graph.create_object("Target", true);
        (Rc::new(RefCell::new(graph)), ScriptServices::default(), id)
    }

    #[test]
    fn component_properties_read_and_write_through() {
        let (scene, services, id) = setup();
        run(
            r#"
                let rb = obj.get_component("Rigidbody2D");
                rb.velocity = vec2(3.0, 4.0);
                rb["mass"] = 2;
            "#,
            &scene,
            &services,
            id,
        )
        .unwrap();

        let graph = scene.borrow();
        let rb = graph.get(id).unwrap().get_component(&ComponentKind::Rigidbody2D).unwrap().clone();
        assert_eq!(rb.property("velocity").unwrap(), PropertyValue::Vec2(Vec2::new(3.0, 4.0)));
        assert_eq!(rb.property("mass").unwrap(), PropertyValue::Float(2.0));
    }

    #[test]
    fn schema_violations_surface_as_script_errors() {
        let (scene, services, id) = setup();
        let err = run(
            r#"let rb = obj.get_component("Rigidbody2D"); rb.speed = 1.0;"#,
            &scene,
            &services,
            id,
        );
        assert!(err.is_err());
        let missing = run(r#"obj.get_component("Camera")"#, &scene, &services, id).unwrap();
        assert!(missing.is_unit());
    }

    #[test]
    fn transform_and_lookup() {
        let (scene, services, id) = setup();
        let result = run(
            r#"
                obj.position = vec2(1.0, 2.0);
                obj.translate(vec2(1.0, 0.0));
                obj.rotation = 90;
                let other = obj.find_object("Target");
                other.is_3d && obj.position.x == 2.0
            "#,
            &scene,
            &services,
            id,
        )
        .unwrap();
        assert!(result.as_bool().unwrap());
        let graph = scene.borrow();
        let transform = graph.get(id).unwrap().transform;
        match transform {
            ObjectTransform::Planar(t) => assert_eq!(t.rotation, 90.0),
            ObjectTransform::Spatial(_) => panic!("object must stay 2D"),
        }
    }

    #[test]
    fn state_store_is_shared() {
        let (scene, services, id) = setup();
        run(r#"obj.state["score"] = 10;"#, &scene, &services, id).unwrap();
        let score = run(r#"obj.state.get("score") + 5"#, &scene, &services, id).unwrap();
        assert_eq!(score.as_int().unwrap(), 15);
    }

    #[test]
    fn received_messages_are_drained_by_scripts() {
        let (scene, services, id) = setup();
        run(r#"obj.network.start_host(); obj.network.send("chat", "hi");"#, &scene, &services, id).unwrap();
        services.network.borrow_mut().update(0.1);
        assert_eq!(services.network.borrow().pending(), 1);

        let first = run(
            r#"let inbox = obj.network.receive(); inbox.len() == 1 && inbox[0].channel == "chat" && inbox[0].payload == "hi""#,
            &scene,
            &services,
            id,
        )
        .unwrap();
        assert!(first.as_bool().unwrap());
        assert_eq!(services.network.borrow().pending(), 0);
        let again = run("obj.network.receive().len()", &scene, &services, id).unwrap();
        assert_eq!(again.as_int().unwrap(), 0);
    }

    #[test]
    fn destroyed_object_faults_the_call() {
        let (scene, services, id) = setup();
        scene.borrow_mut().destroy_object(id).unwrap();
        assert!(run("obj.name", &scene, &services, id).is_err());
        assert!(!run("obj.alive", &scene, &services, id).unwrap().as_bool().unwrap());
    }
}
