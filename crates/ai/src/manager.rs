//! The tree registry and per-frame tick.

use crate::tree::{evaluate, LeafRunner};
use crate::{builtins, AiError, AiState, BtContext, NodeDef, NodeStatus, TreeDef};
use engine_core::{AiBtState, Component, ComponentKind, ObjectId};
use scene::SceneGraph;
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub type ConditionFn = Box<dyn Fn(&mut BtContext) -> Result<bool, AiError>>;
pub type ActionFn = Box<dyn Fn(&mut BtContext) -> Result<NodeStatus, AiError>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AiStats {
    pub ticked: usize,
    pub skipped: usize,
}

/// Owns named trees, leaf functions and every object's [`AiState`].
pub struct BehaviorTreeManager {
    conditions: HashMap<String, ConditionFn>,
    actions: HashMap<String, ActionFn>,
    trees: HashMap<String, NodeDef>,
    states: HashMap<ObjectId, AiState>,
    warned_objects: HashSet<ObjectId>,
    warned_leaves: HashSet<String>,
}

impl Default for BehaviorTreeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorTreeManager {
    /// A manager with the stock leaves and the `DefaultAI` and `PatrolOnly` trees.
    pub fn new() -> Self {
        let mut manager = Self::empty();
        builtins::install(&mut manager);
        log::info!("Behavior trees ready: {}", manager.tree_names().join(", "));
        manager
    }

    pub fn empty() -> Self {
        Self {
            conditions: HashMap::new(),
            actions: HashMap::new(),
            trees: HashMap::new(),
            states: HashMap::new(),
            warned_objects: HashSet::new(),
            warned_leaves: HashSet::new(),
        }
    }

    pub fn register_condition<F>(&mut self, name: impl Into<String>, condition: F)
    where
        F: Fn(&mut BtContext) -> Result<bool, AiError> + 'static,
    {
        self.conditions.insert(name.into(), Box::new(condition));
    }

    pub fn register_action<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: Fn(&mut BtContext) -> Result<NodeStatus, AiError> + 'static,
    {
        self.actions.insert(name.into(), Box::new(action));
    }

    /// Add or replace a tree.
    pub fn register_tree(&mut self, name: impl Into<String>, root: NodeDef) {
        let name = name.into();
        for leaf in root.leaves() {
            if !self.conditions.contains_key(leaf) && !self.actions.contains_key(leaf) {
                log::warn!("Tree '{}' references unknown leaf '{}'", name, leaf);
            }
        }
        self.trees.insert(name, root);
    }

    /// Register every tree in a RON file. Returns how many were loaded.
    pub fn load_trees(&mut self, path: impl AsRef<Path>) -> Result<usize, AiError> {
        let path = path.as_ref();
        let trees = TreeDef::load_all(path)?;
        let count = trees.len();
        for tree in trees {
            self.register_tree(tree.name, tree.root);
        }
        log::info!("Loaded {} behavior tree(s) from {}", count, path.display());
        Ok(count)
    }

    /// Register every `.ron` file in a directory. Unreadable files are logged and skipped.
    pub fn load_tree_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, AiError> {
        let mut total = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "ron") {
                match self.load_trees(&path) {
                    Ok(count) => total += count,
                    Err(err) => log::warn!("Skipping {}: {}", path.display(), err),
                }
            }
        }
        Ok(total)
    }

    pub fn has_tree(&self, name: &str) -> bool {
        self.trees.contains_key(name)
    }

    pub fn tree(&self, name: &str) -> Result<&NodeDef, AiError> {
        self.trees.get(name).ok_or_else(|| AiError::UnknownTree(name.to_string()))
    }

    pub fn tree_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.trees.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn state(&self, id: ObjectId) -> Option<&AiState> {
        self.states.get(&id)
    }

    pub fn state_mut(&mut self, id: ObjectId) -> Option<&mut AiState> {
        self.states.get_mut(&id)
    }

    /// Forget everything kept for a destroyed object.
    pub fn remove_object(&mut self, id: ObjectId) {
        self.states.remove(&id);
        self.warned_objects.remove(&id);
    }

    /// Drop all per-object state, e.g. when a new scene is loaded.
    pub fn clear(&mut self) {
        self.states.clear();
        self.warned_objects.clear();
    }

    /// Evaluate every enabled `BehaviorTree` component once, in scene order.
    pub fn tick(&mut self, scene: &mut SceneGraph, dt: f32) -> AiStats {
        let Self {
            conditions,
            actions,
            trees,
            states,
            warned_objects,
            warned_leaves,
        } = self;
        let mut stats = AiStats::default();

        for id in scene.object_ids() {
            let Some((tree_name, target)) = tree_binding(scene, id) else {
                continue;
            };
            let Some(root) = trees.get(&tree_name) else {
                if warned_objects.insert(id) {
                    log::warn!("Object {} uses unknown behavior tree '{}'; skipping it", id, tree_name);
                }
                stats.skipped += 1;
                continue;
            };
            let target = if target.is_empty() { None } else { scene.find(&target) };

            let state = states.entry(id).or_insert_with(|| seed_state(&*scene, id));
            state.begin_tick();
            let mut runner = Runner {
                ctx: BtContext {
                    scene: &mut *scene,
                    object: id,
                    target,
                    state,
                    dt,
                },
                tree: &tree_name,
                conditions,
                actions,
                warned_leaves: &mut *warned_leaves,
            };
            let status = evaluate(root, &mut runner);
            runner.ctx.state.end_tick();
            log::trace!("{} '{}' -> {:?}", id, tree_name, status);
            stats.ticked += 1;
        }

        stats
    }

    /// Copy every blackboard into its object's `AIBTState` component so it is saved with
    /// the scene.
    pub fn export_state(&self, scene: &mut SceneGraph) {
        for (id, state) in &self.states {
            let Some(object) = scene.get_mut(*id) else {
                continue;
            };
            let component = Component::AiBtState(AiBtState {
                data: state.blackboard.clone(),
            });
            let slot = object
                .components()
                .iter()
                .position(|c| c.is_kind(&ComponentKind::AiBtState));
            match slot {
                Some(index) => object.components_mut()[index] = component,
                None => {
                    object.push_component(component);
                }
            }
        }
    }
}

/// `(tree_name, target)` of the first enabled `BehaviorTree` component.
fn tree_binding(scene: &SceneGraph, id: ObjectId) -> Option<(String, String)> {
    scene.get(id)?.components().iter().find_map(|c| match c {
        Component::BehaviorTree(bt) if bt.enabled => Some((bt.tree_name.clone(), bt.target.clone())),
        _ => None,
    })
}

fn seed_state(scene: &SceneGraph, id: ObjectId) -> AiState {
    let saved = scene
        .get(id)
        .and_then(|o| o.get_component(&ComponentKind::AiBtState).map(Component::properties));
    match saved {
        Some(blackboard) => {
            log::debug!("Restored AI state of {} ({} keys)", id, blackboard.len());
            AiState::from_blackboard(blackboard)
        }
        None => AiState::default(),
    }
}

struct Runner<'a, 'b> {
    ctx: BtContext<'a>,
    tree: &'b str,
    conditions: &'b HashMap<String, ConditionFn>,
    actions: &'b HashMap<String, ActionFn>,
    warned_leaves: &'b mut HashSet<String>,
}

impl Runner<'_, '_> {
    fn missing(&mut self, name: &str) {
        if self.warned_leaves.insert(name.to_string()) {
            log::warn!("Tree '{}': {}", self.tree, AiError::UnknownLeaf(name.to_string()));
        }
    }

    fn leaf_failed(&self, name: &str, err: AiError) {
        log::warn!("Tree '{}' leaf '{}' failed on {}: {}", self.tree, name, self.ctx.object, err);
    }
}

impl LeafRunner for Runner<'_, '_> {
    fn condition(&mut self, name: &str) -> bool {
        let Some(condition) = self.conditions.get(name) else {
            self.missing(name);
            return false;
        };
        match condition(&mut self.ctx) {
            Ok(result) => result,
            Err(err) => {
                self.leaf_failed(name, err);
                false
            }
        }
    }

    fn action(&mut self, name: &str) -> NodeStatus {
        let Some(action) = self.actions.get(name) else {
            self.missing(name);
            return NodeStatus::Failure;
        };
        match action(&mut self.ctx) {
            Ok(status) => status,
            Err(err) => {
                self.leaf_failed(name, err);
                NodeStatus::Failure
            }
        }
    }

    fn wait(&mut self, node: usize, seconds: f32) -> NodeStatus {
        if self.ctx.state.advance_wait(node, seconds, self.ctx.dt) {
            NodeStatus::Success
        } else {
            NodeStatus::Running
        }
    }
}
