//! Uniform values and the flat uniform dictionary

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Upload type of a uniform (`"1f"`, `"1i"`, `"2f"`, `"3f"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniformKind {
    #[serde(rename = "1f")]
    Float,
    #[serde(rename = "1i")]
    Int,
    #[serde(rename = "2f")]
    Vec2,
    #[serde(rename = "3f")]
    Vec3,
}

impl UniformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniformKind::Float => "1f",
            UniformKind::Int => "1i",
            UniformKind::Vec2 => "2f",
            UniformKind::Vec3 => "3f",
        }
    }

    /// GLSL type keyword declaring this uniform
    pub fn glsl_type(&self) -> &'static str {
        match self {
            UniformKind::Float => "float",
            UniformKind::Int => "int",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
        }
    }
}

/// A typed uniform value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum UniformValue {
    #[serde(rename = "1f")]
    Float(f32),
    #[serde(rename = "1i")]
    Int(i32),
    #[serde(rename = "2f")]
    Vec2(Vec2),
    #[serde(rename = "3f")]
    Vec3(Vec3),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            UniformValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match *self {
            UniformValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match *self {
            UniformValue::Vec2(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match *self {
            UniformValue::Vec3(v) => Some(v),
            _ => None,
        }
    }
}

/// A named uniform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uniform {
    pub name: String,
    #[serde(flatten)]
    pub value: UniformValue,
}

/// Insertion-ordered uniform dictionary
///
/// Order matters only for upload order and JSON output; lookups are by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniformDict {
    entries: Vec<Uniform>,
}

impl UniformDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a uniform, keeping its original position on replace
    pub fn insert(&mut self, name: &str, value: UniformValue) {
        match self.entries.iter_mut().find(|u| u.name == name) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Uniform {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.entries.iter().find(|u| u.name == name).map(|u| &u.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uniform> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|u| u.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
