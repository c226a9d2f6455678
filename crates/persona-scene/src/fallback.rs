//! Procedural fallback figure
//!
//! When no asset can be loaded the avatar is built from primitives: a head
//! with eyes and a mouth, a torso with arms and legs, and (for the business
//! theme) a shirt and tie. Pure and synchronous.
//!
//! The fallback has no joints and no blend shapes. It does have a mesh named
//! `mouth`, so the mesh-scale lip-sync channel still moves something.

use serde::{Deserialize, Serialize};

use crate::{
    Color, Geometry, Material, MeshData, NodeData, NodeTree, Shape, Transform, Vec3,
};

/// Name of the fallback root group
pub const FALLBACK_ROOT_NAME: &str = "fallback_avatar";

/// Colors and optional garments of the fallback figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackTheme {
    pub skin: Color,
    pub body: Color,
    pub shirt: Option<Color>,
    pub tie: Option<Color>,
    pub eyes: Color,
    pub mouth: Color,
}

impl FallbackTheme {
    /// Navy suit, white shirt, dark red tie
    pub fn business() -> Self {
        Self {
            skin: Color::from_hex(0xffdbac),
            body: Color::from_hex(0x2c3e50),
            shirt: Some(Color::white()),
            tie: Some(Color::from_hex(0x8b0000)),
            eyes: Color::black(),
            mouth: Color::black(),
        }
    }

    /// Teal body, no garments
    pub fn generic() -> Self {
        Self {
            skin: Color::from_hex(0xffdbac),
            body: Color::from_hex(0x4ecdc4),
            shirt: None,
            tie: None,
            eyes: Color::black(),
            mouth: Color::black(),
        }
    }
}

impl Default for FallbackTheme {
    fn default() -> Self {
        Self::business()
    }
}

/// Builds the primitive humanoid
#[derive(Debug, Clone, Default)]
pub struct FallbackBuilder {
    theme: FallbackTheme,
}

impl FallbackBuilder {
    pub fn new(theme: FallbackTheme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> &FallbackTheme {
        &self.theme
    }

    /// Build the figure as a detached tree rooted at [`FALLBACK_ROOT_NAME`]
    pub fn build(&self) -> NodeTree {
        let theme = &self.theme;
        let mut tree = NodeTree::new(NodeData::group(FALLBACK_ROOT_NAME));

        let head = tree.add(
            part("head", Shape::sphere(0.3, 16), theme.skin, true)
                .with_transform(Transform::at(0.0, 1.7, 0.0)),
            0,
        );

        let body = tree.add(
            part("body", Shape::cylinder(0.3, 0.35, 1.2, 8), theme.body, true)
                .with_transform(Transform::at(0.0, 1.0, 0.0)),
            0,
        );

        // Limbs hang off the body, positioned relative to its center
        for (name, x) in [("arm_left", -0.4), ("arm_right", 0.4)] {
            tree.add(
                part(name, Shape::cylinder(0.07, 0.06, 0.9, 8), theme.body, true)
                    .with_transform(Transform::at(x, 0.1, 0.0)),
                body,
            );
        }
        for (name, x) in [("leg_left", -0.15), ("leg_right", 0.15)] {
            tree.add(
                part(name, Shape::cylinder(0.1, 0.09, 0.4, 8), theme.body, true)
                    .with_transform(Transform::at(x, -0.8, 0.0)),
                body,
            );
        }

        if let Some(shirt) = theme.shirt {
            tree.add(
                part("shirt", Shape::cylinder(0.25, 0.3, 1.0, 8), shirt, false)
                    .with_transform(Transform::at(0.0, 1.0, 0.05)),
                0,
            );
        }

        if let Some(tie) = theme.tie {
            tree.add(
                part("tie", Shape::cylinder(0.03, 0.06, 0.8, 6), tie, false)
                    .with_transform(Transform::at(0.0, 1.2, 0.15)),
                0,
            );
        }

        // Facial features hang off the head so head motion carries them
        for (name, x) in [("eye_left", -0.1), ("eye_right", 0.1)] {
            tree.add(
                part(name, Shape::sphere(0.03, 8), theme.eyes, false)
                    .with_transform(Transform::at(x, 0.05, 0.25)),
                head,
            );
        }

        tree.add(
            part("mouth", Shape::sphere(0.04, 8), theme.mouth, false).with_transform(
                Transform::at(0.0, -0.12, 0.26).with_scale(Vec3::new(1.5, 1.0, 1.0)),
            ),
            head,
        );

        tree
    }
}

fn part(name: &str, shape: Shape, color: Color, cast_shadow: bool) -> NodeData {
    NodeData::mesh(
        name,
        MeshData::new(Geometry::Primitive(shape), Material::lambert(color))
            .with_shadows(cast_shadow, false),
    )
}
