//! Shader branch selectors
//!
//! The fragment shader switches on plain integers; host code works with
//! these enums and converts at the uniform boundary.

use serde::{Deserialize, Serialize};

/// How the noise field carving the shape is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseStyle {
    /// Sin field plus simplex noise
    AdditiveSimplex,
    /// Max of two sin fields, one with simplex noise
    ComparativeSimplex,
    /// Max of two sin fields at randomized frequencies
    SinDifferential,
    /// Min of two sin fields at randomized frequencies
    InvertedSinDifferential,
    /// Max of sin field and high frequency simplex
    ComparativeHighFrequency,
    /// Sin field plus high frequency simplex
    AdditiveHighFrequency,
    /// Min of sin volume and simplex field
    InvertedVolume,
    /// Min of sin volume and axis-stretched simplex field
    StretchedInvertedVolume,
}

impl NoiseStyle {
    pub const ALL: [NoiseStyle; 8] = [
        NoiseStyle::AdditiveSimplex,
        NoiseStyle::ComparativeSimplex,
        NoiseStyle::SinDifferential,
        NoiseStyle::InvertedSinDifferential,
        NoiseStyle::ComparativeHighFrequency,
        NoiseStyle::AdditiveHighFrequency,
        NoiseStyle::InvertedVolume,
        NoiseStyle::StretchedInvertedVolume,
    ];

    /// Weighted selection table; style 0 is twice as likely as the others
    pub const WEIGHTED: [i32; 9] = [0, 0, 1, 2, 3, 4, 5, 6, 7];

    /// Discriminator sent to the shader
    pub fn index(&self) -> i32 {
        *self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseStyle::AdditiveSimplex => "additive simplex",
            NoiseStyle::ComparativeSimplex => "comparative simplex",
            NoiseStyle::SinDifferential => "sin differential",
            NoiseStyle::InvertedSinDifferential => "inverted sin differential",
            NoiseStyle::ComparativeHighFrequency => "comparative high frequency",
            NoiseStyle::AdditiveHighFrequency => "additive high frequency",
            NoiseStyle::InvertedVolume => "inverted volume",
            NoiseStyle::StretchedInvertedVolume => "stretched inverted volume",
        }
    }
}

/// Primitive (or pair of primitives) at the centre of the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseShape {
    Sphere,
    Ellipsoid,
    Octahedron,
    Torus,
    CappedCone,
    Pyramid,
    Cone,
    Cuboid,
    Rhombus,
    /// Sphere smoothly fused with a torus
    Compound,
}

impl BaseShape {
    pub const ALL: [BaseShape; 10] = [
        BaseShape::Sphere,
        BaseShape::Ellipsoid,
        BaseShape::Octahedron,
        BaseShape::Torus,
        BaseShape::CappedCone,
        BaseShape::Pyramid,
        BaseShape::Cone,
        BaseShape::Cuboid,
        BaseShape::Rhombus,
        BaseShape::Compound,
    ];

    pub fn index(&self) -> i32 {
        *self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseShape::Sphere => "sphere",
            BaseShape::Ellipsoid => "ellipsoid",
            BaseShape::Octahedron => "octahedron",
            BaseShape::Torus => "torus",
            BaseShape::CappedCone => "capped cone",
            BaseShape::Pyramid => "pyramid",
            BaseShape::Cone => "cone",
            BaseShape::Cuboid => "cuboid",
            BaseShape::Rhombus => "rhombus",
            BaseShape::Compound => "compound",
        }
    }
}
