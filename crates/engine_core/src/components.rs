//! The closed component schema attached to scene objects.
//!
//! Every known kind is a variant of [`Component`] with a fixed, typed property set.
//! Unrecognized kinds from scene files are kept as [`Component::Unknown`] so they
//! survive a load/save cycle untouched.

use crate::{Color, ComponentError};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Discriminant of a component, used for lookup-by-kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Rigidbody2D,
    Rigidbody3D,
    BoxCollider2D,
    BoxCollider3D,
    SpriteRenderer,
    MeshRenderer,
    Script,
    BehaviorTree,
    AiBtState,
    Camera,
    Unknown(String),
}

impl ComponentKind {
    /// Name used in scene files and script calls.
    pub fn name(&self) -> &str {
        match self {
            Self::Rigidbody2D => "Rigidbody2D",
            Self::Rigidbody3D => "Rigidbody3D",
            Self::BoxCollider2D => "BoxCollider2D",
            Self::BoxCollider3D => "BoxCollider3D",
            Self::SpriteRenderer => "SpriteRenderer",
            Self::MeshRenderer => "MeshRenderer",
            Self::Script => "Script",
            Self::BehaviorTree => "BehaviorTree",
            Self::AiBtState => "AIBTState",
            Self::Camera => "CameraComponent",
            Self::Unknown(name) => name,
        }
    }

    /// Resolve a kind name; anything unrecognized becomes `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Rigidbody2D" => Self::Rigidbody2D,
            "Rigidbody3D" => Self::Rigidbody3D,
            "BoxCollider2D" => Self::BoxCollider2D,
            "BoxCollider3D" => Self::BoxCollider3D,
            "SpriteRenderer" => Self::SpriteRenderer,
            "MeshRenderer" => Self::MeshRenderer,
            "Script" => Self::Script,
            "BehaviorTree" => Self::BehaviorTree,
            "AIBTState" => Self::AiBtState,
            "CameraComponent" | "Camera" => Self::Camera,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Text(String),
    Vec2(Vec2),
    Vec3(Vec3),
    Color(Color),
}

impl PropertyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Color(_) => "color",
        }
    }

    /// Numeric value; integers widen to float.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Self::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec2> for PropertyValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for PropertyValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Color> for PropertyValue {
    fn from(v: Color) -> Self {
        Self::Color(v)
    }
}

/// Rigid body parameters plus the live velocity and continuous force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rigidbody<V> {
    /// Inertia scale; must be > 0 for the body to take part in dynamics.
    pub mass: f32,
    /// Static/kinematic bodies ignore forces but still block dynamic ones.
    pub is_dynamic: bool,
    pub restitution: f32,
    pub linear_damping: f32,
    pub gravity_scale: f32,
    pub velocity: V,
    /// Applied every physics step until changed.
    pub force: V,
}

impl<V: Default> Default for Rigidbody<V> {
    fn default() -> Self {
        Self {
            mass: 1.0,
            is_dynamic: true,
            restitution: 0.3,
            linear_damping: 0.01,
            gravity_scale: 1.0,
            velocity: V::default(),
            force: V::default(),
        }
    }
}

pub type Rigidbody2D = Rigidbody<Vec2>;
pub type Rigidbody3D = Rigidbody<Vec3>;

/// Axis-aligned box in object-local units, unrotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxCollider2D {
    pub width: f32,
    pub height: f32,
}

impl Default for BoxCollider2D {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxCollider3D {
    pub half_extents: Vec3,
}

impl Default for BoxCollider3D {
    fn default() -> Self {
        Self {
            half_extents: Vec3::splat(0.5),
        }
    }
}

/// Sprite draw reference; higher layers draw later.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpriteRenderer {
    pub asset: String,
    pub layer: i64,
    pub tint: Color,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshRenderer {
    pub mesh_asset: String,
    pub material_asset: String,
}

/// Reference to a script module. `enabled = false` suppresses `update` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub file: String,
    pub enabled: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            file: String::new(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorTree {
    pub tree_name: String,
    /// Name or id of the object the tree's conditions and actions track.
    pub target: String,
    pub enabled: bool,
}

impl Default for BehaviorTree {
    fn default() -> Self {
        Self {
            tree_name: "DefaultAI".to_string(),
            target: String::new(),
            enabled: true,
        }
    }
}

/// Exported behavior-tree blackboard. Written by the AI manager, not by hand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiBtState {
    pub data: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub is_active: bool,
    /// Name or id of the object to follow; empty for none.
    pub follow_target: String,
    pub follow_speed: f32,
    /// Orthographic zoom (2D).
    pub zoom: f32,
    /// Vertical field of view in degrees (3D).
    pub fov: f32,
    pub near_clip: f32,
    pub far_clip: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            is_active: false,
            follow_target: String::new(),
            follow_speed: 1.0,
            zoom: 1.0,
            fov: 60.0,
            near_clip: 0.1,
            far_clip: 1000.0,
        }
    }
}

/// Typed behavior data attached to a scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Component {
    Rigidbody2D(Rigidbody2D),
    Rigidbody3D(Rigidbody3D),
    BoxCollider2D(BoxCollider2D),
    BoxCollider3D(BoxCollider3D),
    SpriteRenderer(SpriteRenderer),
    MeshRenderer(MeshRenderer),
    Script(Script),
    BehaviorTree(BehaviorTree),
    AiBtState(AiBtState),
    Camera(Camera),
    Unknown {
        kind: String,
        properties: BTreeMap<String, PropertyValue>,
    },
}

enum FieldError {
    Unknown,
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
}

trait PropertyField {
    const TYPE: &'static str;
    fn to_value(&self) -> PropertyValue;
    fn assign(&mut self, value: PropertyValue) -> Result<(), FieldError>;
}

fn mismatch(expected: &'static str, value: &PropertyValue) -> FieldError {
    FieldError::Mismatch {
        expected,
        found: value.type_name(),
    }
}

impl PropertyField for f32 {
    const TYPE: &'static str = "float";
    fn to_value(&self) -> PropertyValue {
        PropertyValue::Float(*self)
    }
    fn assign(&mut self, value: PropertyValue) -> Result<(), FieldError> {
        *self = value.as_f32().ok_or_else(|| mismatch(Self::TYPE, &value))?;
        Ok(())
    }
}

impl PropertyField for i64 {
    const TYPE: &'static str = "int";
    fn to_value(&self) -> PropertyValue {
        PropertyValue::Int(*self)
    }
    fn assign(&mut self, value: PropertyValue) -> Result<(), FieldError> {
        match value {
            PropertyValue::Int(v) => {
                *self = v;
                Ok(())
            }
            other => Err(mismatch(Self::TYPE, &other)),
        }
    }
}

impl PropertyField for bool {
    const TYPE: &'static str = "bool";
    fn to_value(&self) -> PropertyValue {
        PropertyValue::Bool(*self)
    }
    fn assign(&mut self, value: PropertyValue) -> Result<(), FieldError> {
        *self = value.as_bool().ok_or_else(|| mismatch(Self::TYPE, &value))?;
        Ok(())
    }
}

impl PropertyField for String {
    const TYPE: &'static str = "text";
    fn to_value(&self) -> PropertyValue {
        PropertyValue::Text(self.clone())
    }
    fn assign(&mut self, value: PropertyValue) -> Result<(), FieldError> {
        match value {
            PropertyValue::Text(v) => {
                *self = v;
                Ok(())
            }
            other => Err(mismatch(Self::TYPE, &other)),
        }
    }
}

impl PropertyField for Vec2 {
    const TYPE: &'static str = "vec2";
    fn to_value(&self) -> PropertyValue {
        PropertyValue::Vec2(*self)
    }
    fn assign(&mut self, value: PropertyValue) -> Result<(), FieldError> {
        *self = value.as_vec2().ok_or_else(|| mismatch(Self::TYPE, &value))?;
        Ok(())
    }
}

impl PropertyField for Vec3 {
    const TYPE: &'static str = "vec3";
    fn to_value(&self) -> PropertyValue {
        PropertyValue::Vec3(*self)
    }
    fn assign(&mut self, value: PropertyValue) -> Result<(), FieldError> {
        *self = value.as_vec3().ok_or_else(|| mismatch(Self::TYPE, &value))?;
        Ok(())
    }
}

impl PropertyField for Color {
    const TYPE: &'static str = "color";
    fn to_value(&self) -> PropertyValue {
        PropertyValue::Color(*self)
    }
    fn assign(&mut self, value: PropertyValue) -> Result<(), FieldError> {
        match value {
            PropertyValue::Color(v) => {
                *self = v;
                Ok(())
            }
            other => Err(mismatch(Self::TYPE, &other)),
        }
    }
}

trait Schema {
    const FIELDS: &'static [&'static str];
    fn get_field(&self, name: &str) -> Option<PropertyValue>;
    fn set_field(&mut self, name: &str, value: PropertyValue) -> Result<(), FieldError>;
}

macro_rules! schema {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl Schema for $ty {
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn get_field(&self, name: &str) -> Option<PropertyValue> {
                match name {
                    $(stringify!($field) => Some(PropertyField::to_value(&self.$field)),)*
                    _ => None,
                }
            }

            fn set_field(&mut self, name: &str, value: PropertyValue) -> Result<(), FieldError> {
                match name {
                    $(stringify!($field) => PropertyField::assign(&mut self.$field, value),)*
                    _ => Err(FieldError::Unknown),
                }
            }
        }
    };
}

schema!(Rigidbody2D { mass, is_dynamic, restitution, linear_damping, gravity_scale, velocity, force });
schema!(Rigidbody3D { mass, is_dynamic, restitution, linear_damping, gravity_scale, velocity, force });
schema!(BoxCollider2D { width, height });
schema!(BoxCollider3D { half_extents });
schema!(SpriteRenderer { asset, layer, tint });
schema!(MeshRenderer { mesh_asset, material_asset });
schema!(Script { file, enabled });
schema!(BehaviorTree { tree_name, target, enabled });
schema!(Camera { is_active, follow_target, follow_speed, zoom, fov, near_clip, far_clip });

fn fields_of<S: Schema>(schema: &S) -> BTreeMap<String, PropertyValue> {
    S::FIELDS
        .iter()
        .filter_map(|name| schema.get_field(name).map(|v| (name.to_string(), v)))
        .collect()
}

impl Component {
    /// A component of `kind` with every property at its default.
    pub fn new(kind: &ComponentKind) -> Self {
        match kind {
            ComponentKind::Rigidbody2D => Self::Rigidbody2D(Rigidbody2D::default()),
            ComponentKind::Rigidbody3D => Self::Rigidbody3D(Rigidbody3D::default()),
            ComponentKind::BoxCollider2D => Self::BoxCollider2D(BoxCollider2D::default()),
            ComponentKind::BoxCollider3D => Self::BoxCollider3D(BoxCollider3D::default()),
            ComponentKind::SpriteRenderer => Self::SpriteRenderer(SpriteRenderer::default()),
            ComponentKind::MeshRenderer => Self::MeshRenderer(MeshRenderer::default()),
            ComponentKind::Script => Self::Script(Script::default()),
            ComponentKind::BehaviorTree => Self::BehaviorTree(BehaviorTree::default()),
            ComponentKind::AiBtState => Self::AiBtState(AiBtState::default()),
            ComponentKind::Camera => Self::Camera(Camera::default()),
            ComponentKind::Unknown(name) => Self::Unknown {
                kind: name.clone(),
                properties: BTreeMap::new(),
            },
        }
    }

    /// Build a component from defaults overridden by `properties`.
    ///
    /// Unknown kinds keep the given properties verbatim; known kinds reject names
    /// outside their schema and values of the wrong type.
    pub fn from_properties<I>(kind: &ComponentKind, properties: I) -> Result<Self, ComponentError>
    where
        I: IntoIterator<Item = (String, PropertyValue)>,
    {
        let mut component = Self::new(kind);
        match &mut component {
            Self::Unknown { properties: map, .. } | Self::AiBtState(AiBtState { data: map }) => {
                map.extend(properties);
            }
            _ => {
                for (name, value) in properties {
                    component.set_property(&name, value)?;
                }
            }
        }
        Ok(component)
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Rigidbody2D(_) => ComponentKind::Rigidbody2D,
            Self::Rigidbody3D(_) => ComponentKind::Rigidbody3D,
            Self::BoxCollider2D(_) => ComponentKind::BoxCollider2D,
            Self::BoxCollider3D(_) => ComponentKind::BoxCollider3D,
            Self::SpriteRenderer(_) => ComponentKind::SpriteRenderer,
            Self::MeshRenderer(_) => ComponentKind::MeshRenderer,
            Self::Script(_) => ComponentKind::Script,
            Self::BehaviorTree(_) => ComponentKind::BehaviorTree,
            Self::AiBtState(_) => ComponentKind::AiBtState,
            Self::Camera(_) => ComponentKind::Camera,
            Self::Unknown { kind, .. } => ComponentKind::Unknown(kind.clone()),
        }
    }

    pub fn is_kind(&self, kind: &ComponentKind) -> bool {
        match (self, kind) {
            (Self::Unknown { kind: a, .. }, ComponentKind::Unknown(b)) => a == b,
            (Self::Unknown { .. }, _) | (_, ComponentKind::Unknown(_)) => false,
            _ => self.kind() == *kind,
        }
    }

    /// Read a property by name.
    pub fn property(&self, name: &str) -> Result<PropertyValue, ComponentError> {
        let value = match self {
            Self::Rigidbody2D(c) => c.get_field(name),
            Self::Rigidbody3D(c) => c.get_field(name),
            Self::BoxCollider2D(c) => c.get_field(name),
            Self::BoxCollider3D(c) => c.get_field(name),
            Self::SpriteRenderer(c) => c.get_field(name),
            Self::MeshRenderer(c) => c.get_field(name),
            Self::Script(c) => c.get_field(name),
            Self::BehaviorTree(c) => c.get_field(name),
            Self::Camera(c) => c.get_field(name),
            Self::AiBtState(c) => c.data.get(name).cloned(),
            Self::Unknown { properties, .. } => properties.get(name).cloned(),
        };
        value.ok_or_else(|| ComponentError::UnknownProperty {
            kind: self.kind().name().to_string(),
            property: name.to_string(),
        })
    }

    /// Write a property by name, keeping the schema's name and type fixed.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ComponentError> {
        let kind = self.kind();
        let result = match self {
            Self::Rigidbody2D(c) => c.set_field(name, value),
            Self::Rigidbody3D(c) => c.set_field(name, value),
            Self::BoxCollider2D(c) => c.set_field(name, value),
            Self::BoxCollider3D(c) => c.set_field(name, value),
            Self::SpriteRenderer(c) => c.set_field(name, value),
            Self::MeshRenderer(c) => c.set_field(name, value),
            Self::Script(c) => c.set_field(name, value),
            Self::BehaviorTree(c) => c.set_field(name, value),
            Self::Camera(c) => c.set_field(name, value),
            Self::AiBtState(c) => {
                c.data.insert(name.to_string(), value);
                Ok(())
            }
            Self::Unknown { properties, .. } => match properties.get_mut(name) {
                Some(slot) if slot.type_name() == value.type_name() => {
                    *slot = value;
                    Ok(())
                }
                Some(slot) => Err(FieldError::Mismatch {
                    expected: slot.type_name(),
                    found: value.type_name(),
                }),
                None => Err(FieldError::Unknown),
            },
        };
        result.map_err(|err| match err {
            FieldError::Unknown => ComponentError::UnknownProperty {
                kind: kind.name().to_string(),
                property: name.to_string(),
            },
            FieldError::Mismatch { expected, found } => ComponentError::TypeMismatch {
                kind: kind.name().to_string(),
                property: name.to_string(),
                expected,
                found,
            },
        })
    }

    /// Every property as a name → value map, in schema-independent sorted order.
    pub fn properties(&self) -> BTreeMap<String, PropertyValue> {
        match self {
            Self::Rigidbody2D(c) => fields_of(c),
            Self::Rigidbody3D(c) => fields_of(c),
            Self::BoxCollider2D(c) => fields_of(c),
            Self::BoxCollider3D(c) => fields_of(c),
            Self::SpriteRenderer(c) => fields_of(c),
            Self::MeshRenderer(c) => fields_of(c),
            Self::Script(c) => fields_of(c),
            Self::BehaviorTree(c) => fields_of(c),
            Self::Camera(c) => fields_of(c),
            Self::AiBtState(c) => c.data.clone(),
            Self::Unknown { properties, .. } => properties.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            ComponentKind::Rigidbody2D,
            ComponentKind::BoxCollider3D,
            ComponentKind::AiBtState,
            ComponentKind::Camera,
            ComponentKind::Unknown("ParticleEmitter".to_string()),
        ] {
            assert_eq!(ComponentKind::from_name(kind.name()), kind);
        }
    }

    #[test]
    fn from_properties_overrides_defaults() {
        let body = Component::from_properties(
            &ComponentKind::Rigidbody2D,
            [
                ("mass".to_string(), PropertyValue::Float(2.0)),
                ("is_dynamic".to_string(), PropertyValue::Bool(false)),
            ],
        )
        .unwrap();
        let Component::Rigidbody2D(rb) = &body else {
            panic!("expected a rigidbody");
        };
        assert_eq!(rb.mass, 2.0);
        assert!(!rb.is_dynamic);
        assert_eq!(rb.restitution, 0.3);
    }

    #[test]
    fn integers_coerce_to_float_properties() {
        let mut body = Component::new(&ComponentKind::Rigidbody3D);
        body.set_property("mass", PropertyValue::Int(4)).unwrap();
        assert_eq!(body.property("mass").unwrap(), PropertyValue::Float(4.0));
    }

    #[test]
    fn schema_rejects_unknown_names_and_retyping() {
        let mut script = Component::new(&ComponentKind::Script);
        let err = script.set_property("speed", PropertyValue::Float(1.0)).unwrap_err();
        assert!(matches!(err, ComponentError::UnknownProperty { .. }));

        let err = script.set_property("enabled", PropertyValue::Text("yes".into())).unwrap_err();
        assert_eq!(
            err,
            ComponentError::TypeMismatch {
                kind: "Script".into(),
                property: "enabled".into(),
                expected: "bool",
                found: "text",
            }
        );
    }

    #[test]
    fn unknown_kind_keeps_properties_and_their_types() {
        let mut c = Component::from_properties(
            &ComponentKind::from_name("Emitter"),
            [("rate".to_string(), PropertyValue::Float(3.0))],
        )
        .unwrap();
        assert_eq!(c.kind().name(), "Emitter");
        c.set_property("rate", PropertyValue::Float(5.0)).unwrap();
        assert!(c.set_property("rate", PropertyValue::Bool(true)).is_err());
        assert!(c.set_property("burst", PropertyValue::Int(1)).is_err());
        assert_eq!(c.properties().len(), 1);
    }

    #[test]
    fn properties_lists_every_schema_field() {
        let camera = Component::new(&ComponentKind::Camera);
        let props = camera.properties();
        assert_eq!(props.len(), 7);
        assert_eq!(props["fov"], PropertyValue::Float(60.0));
    }
}
