//! Typed values stored by a settings store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of a setting, declared when the setting is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl SettingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl SettingValue {
    pub fn kind(&self) -> SettingKind {
        match self {
            Self::Bool(_) => SettingKind::Bool,
            Self::Int(_) => SettingKind::Int,
            Self::Long(_) => SettingKind::Long,
            Self::Float(_) => SettingKind::Float,
            Self::Double(_) => SettingKind::Double,
            Self::String(_) => SettingKind::String,
        }
    }

    /// Text form used by stores that keep values as strings.
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::String(v) => v.clone(),
        }
    }

    /// Inverse of [`to_text`](Self::to_text).
    pub fn from_text(kind: SettingKind, text: &str) -> Option<Self> {
        Some(match kind {
            SettingKind::Bool => Self::Bool(text.parse().ok()?),
            SettingKind::Int => Self::Int(text.parse().ok()?),
            SettingKind::Long => Self::Long(text.parse().ok()?),
            SettingKind::Float => Self::Float(text.parse().ok()?),
            SettingKind::Double => Self::Double(text.parse().ok()?),
            SettingKind::String => Self::String(text.to_string()),
        })
    }
}

/// Rust types that map onto one [`SettingKind`].
pub trait SettingType: Sized + Clone + Send + Sync {
    const KIND: SettingKind;

    fn into_value(self) -> SettingValue;

    fn from_value(value: SettingValue) -> Option<Self>;
}

macro_rules! setting_type {
    ($ty:ty, $variant:ident) => {
        impl SettingType for $ty {
            const KIND: SettingKind = SettingKind::$variant;

            fn into_value(self) -> SettingValue {
                SettingValue::$variant(self)
            }

            fn from_value(value: SettingValue) -> Option<Self> {
                match value {
                    SettingValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

setting_type!(bool, Bool);
setting_type!(i32, Int);
setting_type!(i64, Long);
setting_type!(f32, Float);
setting_type!(f64, Double);
setting_type!(String, String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip() {
        for value in [
            SettingValue::Bool(true),
            SettingValue::Int(-3),
            SettingValue::Long(1 << 40),
            SettingValue::Float(0.5),
            SettingValue::Double(2.25),
            SettingValue::String("a b".to_string()),
        ] {
            let text = value.to_text();
            assert_eq!(SettingValue::from_text(value.kind(), &text), Some(value));
        }
    }

    #[test]
    fn test_from_text_rejects_wrong_kind() {
        assert_eq!(SettingValue::from_text(SettingKind::Int, "abc"), None);
        assert_eq!(SettingKind::parse("int"), Some(SettingKind::Int));
        assert_eq!(SettingKind::parse("blob"), None);
    }

    #[test]
    fn test_setting_type_mapping() {
        assert_eq!(i32::KIND, SettingKind::Int);
        assert_eq!(i32::from_value(SettingValue::Int(7)), Some(7));
        assert_eq!(i32::from_value(SettingValue::Long(7)), None);
    }
}
