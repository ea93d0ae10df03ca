//! RON persistence for scenes.
//!
//! Component records are stored loosely as `{ kind, properties }` so files written by a
//! newer build with extra kinds still load; such components round-trip as `Unknown`.

use crate::{SceneError, SceneGraph, SceneObject, SceneSettings};
use engine_core::{Component, ComponentKind, ObjectId, ObjectTransform, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ComponentRecord {
    pub fn from_component(component: &Component) -> Self {
        Self {
            kind: component.kind().name().to_string(),
            properties: component.properties(),
        }
    }

    /// Rebuild the component. Unrecognized properties of known kinds are dropped with a
    /// warning instead of failing the whole scene.
    pub fn to_component(&self, owner: &str) -> Component {
        let kind = ComponentKind::from_name(&self.kind);
        if let Ok(component) = Component::from_properties(&kind, self.properties.clone()) {
            return component;
        }
        let mut component = Component::new(&kind);
        for (name, value) in &self.properties {
            if let Err(err) = component.set_property(name, value.clone()) {
                log::warn!("Scene object '{}': skipping property: {}", owner, err);
            }
        }
        component
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub name: String,
    pub is_3d: bool,
    pub transform: ObjectTransform,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

/// Serializable form of a whole scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub settings: SceneSettings,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
}

impl SceneDocument {
    /// Snapshot a live graph, objects in insertion order.
    pub fn from_graph(graph: &SceneGraph) -> Self {
        let objects = graph
            .objects()
            .map(|object| ObjectRecord {
                id: object.id(),
                name: object.name.clone(),
                is_3d: object.is_3d(),
                transform: object.transform,
                components: object.components().iter().map(ComponentRecord::from_component).collect(),
            })
            .collect();
        Self {
            name: graph.name.clone(),
            settings: graph.settings.clone(),
            objects,
        }
    }

    /// Build a live graph. Duplicate ids and 2D/3D flag mismatches are corruption.
    pub fn into_graph(self) -> Result<SceneGraph, SceneError> {
        let mut graph = SceneGraph::new(self.name);
        graph.settings = self.settings;

        let mut seen = HashSet::new();
        for record in self.objects {
            if !seen.insert(record.id) {
                return Err(SceneError::Corrupt(format!("duplicate object id {}", record.id)));
            }
            if record.is_3d != record.transform.is_3d() {
                return Err(SceneError::Corrupt(format!(
                    "object {} '{}' is_3d={} does not match its transform",
                    record.id, record.name, record.is_3d
                )));
            }
            if !record.transform.is_finite() {
                return Err(SceneError::Corrupt(format!(
                    "object {} '{}' has a non-finite transform",
                    record.id, record.name
                )));
            }

            let mut object = SceneObject::new(record.id, record.name, record.is_3d);
            object.transform = record.transform;
            for record_component in &record.components {
                let component = record_component.to_component(&object.name);
                object.push_component(component);
            }
            graph.insert_object(object)?;
        }
        Ok(graph)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, SceneError> {
        Ok(ron::from_str(text)?)
    }

    pub fn to_ron_string(&self) -> Result<String, SceneError> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(6);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}

impl SceneGraph {
    /// Load a scene file into a fresh graph.
    pub fn load(path: impl AsRef<Path>) -> Result<SceneGraph, SceneError> {
        let path = path.as_ref();
        let graph = SceneDocument::load(path)?.into_graph()?;
        log::info!("Loaded scene '{}' ({} objects) from {}", graph.name, graph.len(), path.display());
        Ok(graph)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        SceneDocument::from_graph(self).save(path)?;
        log::info!("Saved scene '{}' to {}", self.name, path.display());
        Ok(())
    }
}
