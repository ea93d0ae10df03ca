//! Scene objects and their per-object component store.

use engine_core::{Component, ComponentError, ComponentKind, ObjectId, ObjectTransform, PropertyValue};

/// A named entity in the scene with a transform and an ordered list of components.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    id: ObjectId,
    pub name: String,
    pub transform: ObjectTransform,
    components: Vec<Component>,
}

impl SceneObject {
    pub fn new(id: ObjectId, name: impl Into<String>, is_3d: bool) -> Self {
        Self {
            id,
            name: name.into(),
            transform: ObjectTransform::identity(is_3d),
            components: Vec::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn is_3d(&self) -> bool {
        self.transform.is_3d()
    }

    /// Append a component of `kind` built from defaults plus `properties`.
    pub fn add_component<I>(&mut self, kind: &ComponentKind, properties: I) -> Result<&mut Component, ComponentError>
    where
        I: IntoIterator<Item = (String, PropertyValue)>,
    {
        let component = Component::from_properties(kind, properties)?;
        Ok(self.push_component(component))
    }

    /// Append an already-built component.
    pub fn push_component(&mut self, component: Component) -> &mut Component {
        self.components.push(component);
        let last = self.components.len() - 1;
        &mut self.components[last]
    }

    /// First component of `kind` in sequence order.
    pub fn get_component(&self, kind: &ComponentKind) -> Option<&Component> {
        self.components.iter().find(|c| c.is_kind(kind))
    }

    pub fn get_component_mut(&mut self, kind: &ComponentKind) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.is_kind(kind))
    }

    /// Remove the first component of `kind`, returning it.
    pub fn remove_component(&mut self, kind: &ComponentKind) -> Option<Component> {
        let index = self.components.iter().position(|c| c.is_kind(kind))?;
        Some(self.components.remove(index))
    }

    pub fn has_component(&self, kind: &ComponentKind) -> bool {
        self.get_component(kind).is_some()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut [Component] {
        &mut self.components
    }

    /// The `ordinal`-th component of `kind` (0-based), counting only that kind.
    pub fn nth_component(&self, kind: &ComponentKind, ordinal: usize) -> Option<&Component> {
        self.components.iter().filter(|c| c.is_kind(kind)).nth(ordinal)
    }

    pub fn nth_component_mut(&mut self, kind: &ComponentKind, ordinal: usize) -> Option<&mut Component> {
        self.components.iter_mut().filter(|c| c.is_kind(kind)).nth(ordinal)
    }

    /// Number of components of `kind`.
    pub fn count_components(&self, kind: &ComponentKind) -> usize {
        self.components.iter().filter(|c| c.is_kind(kind)).count()
    }
}
