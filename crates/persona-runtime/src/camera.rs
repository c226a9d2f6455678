//! Camera and light rig

use persona_scene::{Color, Vec3};

/// Perspective camera looking at the avatar's upper body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl PerspectiveCamera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self {
            fov: 75.0,
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 1.6, 3.0),
        };
        camera.set_aspect(width, height);
        camera
    }

    /// Update the aspect ratio. A zero height keeps the previous ratio.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

/// Scene lighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    Directional {
        color: Color,
        intensity: f32,
        position: Vec3,
        cast_shadow: bool,
    },
}

impl Light {
    /// Soft ambient, a shadow-casting key light and a fill light
    pub fn default_rig() -> Vec<Light> {
        vec![
            Light::Ambient {
                color: Color::from_hex(0x404040),
                intensity: 0.6,
            },
            Light::Directional {
                color: Color::white(),
                intensity: 0.8,
                position: Vec3::new(-1.0, 1.0, 1.0),
                cast_shadow: true,
            },
            Light::Directional {
                color: Color::white(),
                intensity: 0.3,
                position: Vec3::new(1.0, 0.0, 1.0),
                cast_shadow: false,
            },
        ]
    }

    pub fn casts_shadow(&self) -> bool {
        matches!(
            self,
            Light::Directional {
                cast_shadow: true,
                ..
            }
        )
    }
}
