//! Primitive geometry and materials
//!
//! Geometry is kept descriptive: the surface that draws the scene decides
//! how to tessellate it. Loaded meshes carry [`Geometry::Buffer`] with the
//! counts that matter to the avatar.

use serde::{Deserialize, Serialize};

use crate::Color;

/// Primitive shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere {
        radius: f32,
        segments: u32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        segments: u32,
    },
    Capsule {
        radius: f32,
        length: f32,
    },
    Box {
        half_extents: [f32; 3],
    },
    Ring {
        inner_radius: f32,
        outer_radius: f32,
        segments: u32,
    },
}

impl Shape {
    pub fn sphere(radius: f32, segments: u32) -> Self {
        Shape::Sphere { radius, segments }
    }

    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> Self {
        Shape::Cylinder {
            radius_top,
            radius_bottom,
            height,
            segments,
        }
    }

    /// Human readable summary, used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            Shape::Sphere { radius, .. } => format!("Sphere (r: {:.2})", radius),
            Shape::Cylinder {
                radius_top,
                radius_bottom,
                height,
                ..
            } => format!(
                "Cylinder (r: {:.2}-{:.2}, h: {:.2})",
                radius_top, radius_bottom, height
            ),
            Shape::Capsule { radius, length } => {
                format!("Capsule (r: {:.2}, l: {:.2})", radius, length)
            }
            Shape::Box { half_extents } => format!(
                "Box ({:.2}, {:.2}, {:.2})",
                half_extents[0], half_extents[1], half_extents[2]
            ),
            Shape::Ring {
                inner_radius,
                outer_radius,
                ..
            } => format!("Ring (r: {:.2}-{:.2})", inner_radius, outer_radius),
        }
    }
}

/// Mesh geometry
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Procedural primitive
    Primitive(Shape),
    /// Geometry decoded from an asset
    Buffer {
        vertex_count: usize,
        index_count: usize,
    },
}

/// Lighting model of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Shading {
    #[default]
    Lambert,
    Standard,
}

/// Surface material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: Color,
    pub shading: Shading,
    pub roughness: f32,
    pub metalness: f32,
    pub double_sided: bool,
}

impl Material {
    pub fn lambert(color: Color) -> Self {
        Self {
            color,
            shading: Shading::Lambert,
            roughness: 1.0,
            metalness: 0.0,
            double_sided: false,
        }
    }

    pub fn standard(color: Color, roughness: f32, metalness: f32) -> Self {
        Self {
            color,
            shading: Shading::Standard,
            roughness,
            metalness,
            double_sided: false,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::standard(Color::white(), 1.0, 0.0)
    }
}
