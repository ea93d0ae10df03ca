//! Conversions between component property values and Rhai values.

use engine_core::{Color, PropertyValue};
use glam::{Vec2, Vec3};
use rhai::{Dynamic, INT};

pub fn to_dynamic(value: &PropertyValue) -> Dynamic {
    match value {
        PropertyValue::Bool(v) => Dynamic::from_bool(*v),
        PropertyValue::Int(v) => Dynamic::from_int(*v as INT),
        PropertyValue::Float(v) => Dynamic::from_float(*v),
        PropertyValue::Text(v) => Dynamic::from(v.clone()),
        PropertyValue::Vec2(v) => Dynamic::from(*v),
        PropertyValue::Vec3(v) => Dynamic::from(*v),
        PropertyValue::Color(v) => Dynamic::from(*v),
    }
}

/// Convert a script value into a property value, or report its Rhai type name.
pub fn from_dynamic(value: Dynamic) -> Result<PropertyValue, String> {
    if let Ok(v) = value.as_bool() {
        return Ok(PropertyValue::Bool(v));
    }
    if let Ok(v) = value.as_int() {
        return Ok(PropertyValue::Int(v));
    }
    if let Ok(v) = value.as_float() {
        return Ok(PropertyValue::Float(v));
    }
    if value.is_string() {
        return value.into_string().map(PropertyValue::Text).map_err(|t| t.to_string());
    }
    if value.is::<Vec2>() {
        return Ok(PropertyValue::Vec2(value.cast::<Vec2>()));
    }
    if value.is::<Vec3>() {
        return Ok(PropertyValue::Vec3(value.cast::<Vec3>()));
    }
    if value.is::<Color>() {
        return Ok(PropertyValue::Color(value.cast::<Color>()));
    }
    Err(value.type_name().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_numbers_keep_their_kind() {
        assert_eq!(from_dynamic(Dynamic::from_int(3)).unwrap(), PropertyValue::Int(3));
        assert_eq!(from_dynamic(Dynamic::from_float(0.5)).unwrap(), PropertyValue::Float(0.5));
        let v = Vec2::new(1.0, -2.0);
        assert_eq!(from_dynamic(to_dynamic(&PropertyValue::Vec2(v))).unwrap(), PropertyValue::Vec2(v));
    }

    #[test]
    fn unsupported_values_report_their_type() {
        let err = from_dynamic(Dynamic::from_array(Vec::new())).unwrap_err();
        assert_eq!(err, "array");
    }
}
