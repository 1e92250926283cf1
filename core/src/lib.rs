//! CHIP-8 virtual machine: machine state and instruction engine.
//!
//! A host drives [`Chip8::step`] at its chosen instruction rate and
//! [`Chip8::tick_timers`] at 60 Hz, reading the framebuffer and sound timer
//! and writing the keypad in between.

mod chip8;
mod error;
mod framebuffer;
mod instruction;
mod machine;
mod palette;

pub use chip8::{Chip8, Chip8Builder, Mode, Quirks, Step};
pub use error::{Fault, LoadError};
pub use framebuffer::{Framebuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use instruction::{disassemble, Instruction};
pub use machine::{Machine, DEFAULT_FONT, MAX_PROGRAM_SIZE, MEMORY_SIZE, PROGRAM_START};
pub use palette::{Palette, ParseRgbError, Rgb, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
