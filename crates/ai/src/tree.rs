//! Behavior tree definitions and evaluation.

use crate::AiError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of evaluating a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Success,
    Failure,
    Running,
}

/// Behavior node types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeDef {
    /// Runs children in order; stops at the first child that fails or is running.
    Sequence(Vec<NodeDef>),
    /// Runs children in order; stops at the first child that succeeds or is running.
    Selector(Vec<NodeDef>),
    /// Swaps success and failure.
    Inverter(Box<NodeDef>),
    /// Reports success unless the child is still running.
    Succeeder(Box<NodeDef>),
    /// Checks a named condition.
    Condition(String),
    /// Executes a named action.
    Action(String),
    /// Running until the given number of seconds has passed, then success.
    Wait(f32),
}

impl NodeDef {
    pub fn sequence(children: Vec<NodeDef>) -> Self {
        Self::Sequence(children)
    }

    pub fn selector(children: Vec<NodeDef>) -> Self {
        Self::Selector(children)
    }

    pub fn inverter(child: NodeDef) -> Self {
        Self::Inverter(Box::new(child))
    }

    pub fn succeeder(child: NodeDef) -> Self {
        Self::Succeeder(Box::new(child))
    }

    pub fn condition(name: impl Into<String>) -> Self {
        Self::Condition(name.into())
    }

    pub fn action(name: impl Into<String>) -> Self {
        Self::Action(name.into())
    }

    pub fn wait(seconds: f32) -> Self {
        Self::Wait(seconds)
    }

    /// Number of nodes in this subtree, itself included.
    pub fn size(&self) -> usize {
        match self {
            Self::Sequence(children) | Self::Selector(children) => 1 + children.iter().map(NodeDef::size).sum::<usize>(),
            Self::Inverter(child) | Self::Succeeder(child) => 1 + child.size(),
            Self::Condition(_) | Self::Action(_) | Self::Wait(_) => 1,
        }
    }

    /// Every condition and action name referenced by the subtree.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Sequence(children) | Self::Selector(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            Self::Inverter(child) | Self::Succeeder(child) => child.collect_leaves(out),
            Self::Condition(name) | Self::Action(name) => out.push(name),
            Self::Wait(_) => {}
        }
    }
}

/// A named tree as stored in a `.ron` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDef {
    pub name: String,
    pub root: NodeDef,
}

impl TreeDef {
    pub fn new(name: impl Into<String>, root: NodeDef) -> Self {
        Self { name: name.into(), root }
    }

    /// Parse a list of trees.
    pub fn parse_all(text: &str) -> Result<Vec<TreeDef>, AiError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<TreeDef>, AiError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_all(&text)
    }
}

/// Resolves the leaves of a tree for one object.
pub trait LeafRunner {
    fn condition(&mut self, name: &str) -> bool;
    fn action(&mut self, name: &str) -> NodeStatus;
    /// Advance the wait node with preorder index `node`.
    fn wait(&mut self, node: usize, seconds: f32) -> NodeStatus;
}

/// Evaluate a tree from its root.
pub fn evaluate(root: &NodeDef, runner: &mut impl LeafRunner) -> NodeStatus {
    evaluate_node(root, 0, runner)
}

fn evaluate_node(node: &NodeDef, index: usize, runner: &mut impl LeafRunner) -> NodeStatus {
    match node {
        NodeDef::Sequence(children) => {
            let mut child_index = index + 1;
            for child in children {
                match evaluate_node(child, child_index, runner) {
                    NodeStatus::Success => child_index += child.size(),
                    other => return other,
                }
            }
            NodeStatus::Success
        }
        NodeDef::Selector(children) => {
            let mut child_index = index + 1;
            for child in children {
                match evaluate_node(child, child_index, runner) {
                    NodeStatus::Failure => child_index += child.size(),
                    other => return other,
                }
            }
            NodeStatus::Failure
        }
        NodeDef::Inverter(child) => match evaluate_node(child, index + 1, runner) {
            NodeStatus::Success => NodeStatus::Failure,
            NodeStatus::Failure => NodeStatus::Success,
            NodeStatus::Running => NodeStatus::Running,
        },
        NodeDef::Succeeder(child) => match evaluate_node(child, index + 1, runner) {
            NodeStatus::Running => NodeStatus::Running,
            _ => NodeStatus::Success,
        },
        NodeDef::Condition(name) => {
            if runner.condition(name) {
                NodeStatus::Success
            } else {
                NodeStatus::Failure
            }
        }
        NodeDef::Action(name) => runner.action(name),
        NodeDef::Wait(seconds) => runner.wait(index, *seconds),
    }
}
