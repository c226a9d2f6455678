//! Render surface abstraction
//!
//! The scene manager hands a [`FrameView`] to a surface once per tick. What
//! the surface does with it (rasterize, record, stream) is its business.

use persona_core::PersonaResult;
use persona_scene::Scene;

use crate::{Light, PerspectiveCamera};

/// Everything needed to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub scene: &'a Scene,
    pub camera: &'a PerspectiveCamera,
    pub lights: &'a [Light],
    pub frame: u64,
}

/// Output target of the render loop
pub trait RenderSurface {
    fn size(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32);

    fn draw(&mut self, view: &FrameView<'_>) -> PersonaResult<()>;
}

/// What a headless surface saw on its last draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawRecord {
    pub frame: u64,
    pub nodes: usize,
    pub lights: usize,
}

/// Surface that draws nothing and remembers what it was asked to draw
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    draws: u64,
    last: Option<DrawRecord>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            draws: 0,
            last: None,
        }
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn last_draw(&self) -> Option<DrawRecord> {
        self.last
    }
}

impl RenderSurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn draw(&mut self, view: &FrameView<'_>) -> PersonaResult<()> {
        self.draws += 1;
        self.last = Some(DrawRecord {
            frame: view.frame,
            nodes: view.scene.node_count(),
            lights: view.lights.len(),
        });
        Ok(())
    }
}
