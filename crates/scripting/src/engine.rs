//! Binds `Script` components to modules and drives their hooks every frame.

use crate::api::register_api;
use crate::{RhaiModule, ScriptContext, ScriptError, ScriptModule, ScriptSandbox, ScriptServices, SharedScene};
use engine_core::{Component, ObjectId};
use rhai::{Engine, AST};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::rc::Rc;

/// Builds a fresh native module instance for each binding.
pub type NativeFactory = Box<dyn Fn() -> Box<dyn ScriptModule>>;

#[derive(Debug, Clone)]
pub struct ScriptConfig {
    /// Directory Rhai script files are resolved against.
    pub root: PathBuf,
    /// Rhai operations allowed per hook call.
    pub max_operations: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("scripts"),
            max_operations: 100_000,
        }
    }
}

/// Lifecycle of one script binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Slot seen but the component has never been enabled.
    Unbound,
    /// `init` ran this frame.
    Initialized,
    /// `update` runs every frame.
    Active,
    /// Component disabled after init; `update` is paused.
    Disabled,
    /// Load, `init` or `update` failed. The binding stays inert for the session.
    Faulted,
    Destroyed,
}

struct Binding {
    file: String,
    state: BindingState,
    module: Option<Box<dyn ScriptModule>>,
    context: ScriptContext,
    initialized: bool,
}

impl Binding {
    fn new(file: String) -> Self {
        Self {
            file,
            state: BindingState::Unbound,
            module: None,
            context: ScriptContext::default(),
            initialized: false,
        }
    }
}

/// Counters for one [`ScriptEngine::update`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptStats {
    pub initialized: usize,
    pub updated: usize,
    pub faulted: usize,
}

/// Owns every binding and the shared Rhai engine.
pub struct ScriptEngine {
    rhai: Rc<Engine>,
    config: ScriptConfig,
    natives: HashMap<String, NativeFactory>,
    sources: HashMap<String, String>,
    cache: HashMap<String, Rc<AST>>,
    bindings: HashMap<ObjectId, Vec<Binding>>,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new(ScriptConfig::default())
    }
}

impl ScriptEngine {
    pub fn new(config: ScriptConfig) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(config.max_operations);
        engine.on_print(|text| log::info!("[script] {}", text));
        engine.on_debug(|text, source, pos| log::debug!("[script {}:{}] {}", source.unwrap_or("?"), pos, text));
        register_api(&mut engine);

        Self {
            rhai: Rc::new(engine),
            config,
            natives: HashMap::new(),
            sources: HashMap::new(),
            cache: HashMap::new(),
            bindings: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// Register a native module under a script file name.
    pub fn register_native<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn ScriptModule> + 'static,
    {
        self.natives.insert(name.into(), Box::new(factory));
    }

    /// Register Rhai source under a file name, shadowing any file on disk.
    pub fn register_source(&mut self, name: impl Into<String>, source: impl Into<String>) {
        let name = name.into();
        self.cache.remove(&name);
        self.sources.insert(name, source.into());
    }

    /// Forget compiled scripts so edited files are picked up by new bindings.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn binding_states(&self, id: ObjectId) -> Vec<BindingState> {
        self.bindings
            .get(&id)
            .map(|slots| slots.iter().map(|b| b.state).collect())
            .unwrap_or_default()
    }

    /// Persistent context of the `ordinal`-th Script component of an object.
    pub fn context(&self, id: ObjectId, ordinal: usize) -> Option<&ScriptContext> {
        self.bindings.get(&id)?.get(ordinal).map(|b| &b.context)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    /// Run one frame of script hooks.
    ///
    /// Objects are visited in scene order and Script components in component order.
    /// A fault is contained to its binding.
    pub fn update(&mut self, scene: &SharedScene, services: &ScriptServices, dt: f32) -> ScriptStats {
        let mut stats = ScriptStats::default();
        let ids = scene.borrow().object_ids();

        for id in ids {
            let Some(scripts) = script_slots(scene, id) else {
                continue;
            };
            let mut slots = self.bindings.remove(&id).unwrap_or_default();
            if scripts.is_empty() && slots.is_empty() {
                continue;
            }
            let sandbox = ScriptSandbox::new(id, scene.clone(), services.clone());

            self.reconcile(&mut slots, &scripts, &sandbox);
            for (binding, (_, enabled)) in slots.iter_mut().zip(&scripts) {
                self.step(binding, *enabled, &sandbox, dt, &mut stats);
            }

            if !slots.is_empty() {
                self.bindings.insert(id, slots);
            }
        }

        self.prune_orphans(scene, services);
        stats
    }

    /// Run `cleanup` for every binding of an object and drop them.
    ///
    /// Call while the object is still live so cleanup hooks can read it.
    pub fn unbind_object(&mut self, id: ObjectId, scene: &SharedScene, services: &ScriptServices) {
        let Some(slots) = self.bindings.remove(&id) else {
            return;
        };
        let sandbox = ScriptSandbox::new(id, scene.clone(), services.clone());
        for binding in slots {
            teardown(binding, &sandbox);
        }
    }

    /// Tear down every binding, in scene order first.
    pub fn unbind_all(&mut self, scene: &SharedScene, services: &ScriptServices) {
        let ids = scene.borrow().object_ids();
        for id in ids {
            self.unbind_object(id, scene, services);
        }
        let rest: Vec<ObjectId> = self.bindings.keys().copied().collect();
        for id in rest {
            self.unbind_object(id, scene, services);
        }
    }

    /// Apply Script component removals and file changes of one object right away.
    ///
    /// Runs `cleanup` for bindings whose slot went away. New slots are left Unbound
    /// for the next [`ScriptEngine::update`].
    pub fn sync_object(&mut self, id: ObjectId, scene: &SharedScene, services: &ScriptServices) {
        let Some(mut slots) = self.bindings.remove(&id) else {
            return;
        };
        let sandbox = ScriptSandbox::new(id, scene.clone(), services.clone());
        let scripts = script_slots(scene, id).unwrap_or_default();
        self.reconcile(&mut slots, &scripts, &sandbox);
        if !slots.is_empty() {
            self.bindings.insert(id, slots);
        }
    }

    /// Tear down the binding of the `ordinal`-th Script component, which was just removed
    /// from `id`, then match the remaining bindings to the object's Script components.
    pub fn remove_slot(&mut self, id: ObjectId, ordinal: usize, scene: &SharedScene, services: &ScriptServices) {
        let Some(mut slots) = self.bindings.remove(&id) else {
            return;
        };
        let sandbox = ScriptSandbox::new(id, scene.clone(), services.clone());
        if ordinal < slots.len() {
            teardown(slots.remove(ordinal), &sandbox);
        }
        let scripts = script_slots(scene, id).unwrap_or_default();
        self.reconcile(&mut slots, &scripts, &sandbox);
        if !slots.is_empty() {
            self.bindings.insert(id, slots);
        }
    }

    /// Match bindings to the object's current Script components in order.
    ///
    /// A binding survives when its file shows up at or after the cursor, so removing
    /// a component from the middle keeps every later binding with its state and context.
    /// Skipped bindings are torn down, unmatched components get a fresh Unbound binding.
    fn reconcile(&self, slots: &mut Vec<Binding>, scripts: &[(String, bool)], sandbox: &ScriptSandbox) {
        let mut old: VecDeque<Binding> = std::mem::take(slots).into();
        for (ordinal, (file, _)) in scripts.iter().enumerate() {
            match old.iter().position(|binding| binding.file == *file) {
                Some(skip) => {
                    for dropped in old.drain(..skip) {
                        teardown(dropped, sandbox);
                    }
                    slots.extend(old.pop_front());
                }
                None => {
                    log::debug!("Script slot {} of {} bound to '{}'", ordinal, sandbox.id(), file);
                    slots.push(Binding::new(file.clone()));
                }
            }
        }
        for extra in old {
            teardown(extra, sandbox);
        }
    }

    fn step(&mut self, binding: &mut Binding, enabled: bool, sandbox: &ScriptSandbox, dt: f32, stats: &mut ScriptStats) {
        match (binding.state, enabled) {
            (BindingState::Unbound, true) => {
                let result = self.load(&binding.file).and_then(|mut module| {
                    module.init(sandbox, &mut binding.context)?;
                    Ok(module)
                });
                match result {
                    Ok(module) => {
                        binding.module = Some(module);
                        binding.initialized = true;
                        binding.state = BindingState::Initialized;
                        stats.initialized += 1;
                    }
                    Err(err) => {
                        log::error!("Script '{}' on {} disabled: {}", binding.file, sandbox.id(), err);
                        binding.state = BindingState::Faulted;
                        stats.faulted += 1;
                    }
                }
            }
            (BindingState::Initialized | BindingState::Active | BindingState::Disabled, true) => {
                let Some(module) = binding.module.as_mut() else {
                    binding.state = BindingState::Faulted;
                    return;
                };
                match module.update(sandbox, &mut binding.context, dt) {
                    Ok(()) => {
                        binding.state = BindingState::Active;
                        stats.updated += 1;
                    }
                    Err(err) => {
                        log::error!("Script '{}' on {} disabled: {}", binding.file, sandbox.id(), err);
                        binding.state = BindingState::Faulted;
                        stats.faulted += 1;
                    }
                }
            }
            (BindingState::Initialized | BindingState::Active, false) => {
                binding.state = BindingState::Disabled;
            }
            _ => {}
        }
    }

    fn load(&mut self, file: &str) -> Result<Box<dyn ScriptModule>, ScriptError> {
        if let Some(factory) = self.natives.get(file) {
            return Ok(factory());
        }
        let ast = self.compile(file)?;
        Ok(Box::new(RhaiModule::new(self.rhai.clone(), ast, file)))
    }

    fn compile(&mut self, file: &str) -> Result<Rc<AST>, ScriptError> {
        if let Some(ast) = self.cache.get(file) {
            return Ok(ast.clone());
        }
        let source = match self.sources.get(file) {
            Some(source) => source.clone(),
            None => {
                let path = self.config.root.join(file);
                std::fs::read_to_string(&path).map_err(|err| ScriptError::Load {
                    file: file.to_string(),
                    message: format!("{}: {}", path.display(), err),
                })?
            }
        };
        let ast = self.rhai.compile(&source).map_err(|err| ScriptError::Load {
            file: file.to_string(),
            message: err.to_string(),
        })?;
        log::debug!("Compiled script '{}'", file);
        let ast = Rc::new(ast);
        self.cache.insert(file.to_string(), ast.clone());
        Ok(ast)
    }

    fn prune_orphans(&mut self, scene: &SharedScene, services: &ScriptServices) {
        let orphans: Vec<ObjectId> = {
            let graph = scene.borrow();
            self.bindings.keys().copied().filter(|id| !graph.contains(*id)).collect()
        };
        for id in orphans {
            log::warn!("Object {} left the scene without unbinding its scripts", id);
            self.unbind_object(id, scene, services);
        }
    }
}

/// `(file, enabled)` per Script component, or `None` if the object is gone.
fn script_slots(scene: &SharedScene, id: ObjectId) -> Option<Vec<(String, bool)>> {
    let graph = scene.borrow();
    let object = graph.get(id)?;
    Some(
        object
            .components()
            .iter()
            .filter_map(|c| match c {
                Component::Script(s) => Some((s.file.clone(), s.enabled)),
                _ => None,
            })
            .collect(),
    )
}

fn teardown(mut binding: Binding, sandbox: &ScriptSandbox) {
    if binding.initialized {
        if let Some(module) = binding.module.as_mut() {
            if let Err(err) = module.cleanup(sandbox, &mut binding.context) {
                log::error!("Script '{}' on {}: {}", binding.file, sandbox.id(), err);
            }
        }
    }
    binding.state = BindingState::Destroyed;
    log::debug!("Unbound script '{}' from {}", binding.file, sandbox.id());
}
