use crate::palette::{Palette, Rgb};

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// 64x32 monochrome display, one byte per cell holding 0 or 1, row-major.
#[derive(Clone, Debug)]
pub struct Framebuffer {
    cells: Vec<u8>,
    draw_pending: bool,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer::new()
    }
}

impl Framebuffer {
    pub fn new() -> Framebuffer {
        Framebuffer {
            cells: vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT],
            draw_pending: true,
        }
    }

    /// Raw cells, `cells()[x + y * 64]`.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.cells[Self::offset(x, y)] != 0
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = 0);
        self.draw_pending = true;
    }

    /// XORs a single lit sprite bit onto `(x, y)`.
    /// Returns true when the pixel was on before, i.e. a collision.
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        let cell = &mut self.cells[Self::offset(x, y)];
        let collided = *cell != 0;
        *cell ^= 1;
        self.draw_pending = true;
        collided
    }

    pub fn is_draw_pending(&self) -> bool {
        self.draw_pending
    }

    pub fn set_draw_pending(&mut self, pending: bool) {
        self.draw_pending = pending;
    }

    /// Clears the pending flag, returning whether a frame was waiting.
    pub fn take_draw_pending(&mut self) -> bool {
        std::mem::replace(&mut self.draw_pending, false)
    }

    pub fn to_rgb(&self, palette: &Palette) -> Vec<Rgb> {
        self.cells.iter().map(|&c| palette.color(c)).collect()
    }

    fn offset(x: usize, y: usize) -> usize {
        assert!(x < SCREEN_WIDTH && y < SCREEN_HEIGHT, "pixel ({}, {}) off screen", x, y);
        y * SCREEN_WIDTH + x
    }
}
