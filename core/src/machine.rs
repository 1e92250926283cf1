use log::debug;

use crate::error::LoadError;
use crate::framebuffer::Framebuffer;

pub const MEMORY_SIZE: usize = 0x1000;
pub const PROGRAM_START: u16 = 0x200;
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;
pub const FONT_ADDR: usize = 0x000;
pub const GLYPH_SIZE: usize = 5;
pub const STACK_DEPTH: usize = 16;

/// Mask applied to every address before it indexes memory.
pub(crate) const ADDR_MASK: u16 = 0x0FFF;

pub static DEFAULT_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Everything a CHIP-8 program can observe or change.
///
/// Renderers read the framebuffer, audio reads the sound timer, and input
/// writes the keypad, all between engine steps.
#[derive(Clone, Debug)]
pub struct Machine {
    /// Memory
    pub(crate) memory: Box<[u8; MEMORY_SIZE]>,
    /// General purpose registers, VF doubles as the flag register
    pub(crate) regs: [u8; 16],
    /// Index register
    pub(crate) index: u16,
    /// Program counter
    pub(crate) pc: u16,
    /// Call stack
    pub(crate) stack: [u16; STACK_DEPTH],
    /// Stack pointer
    pub(crate) sp: u8,
    /// Delay Timer
    pub(crate) delay_timer: u8,
    /// Sound Timer
    pub(crate) sound_timer: u8,
    /// Display
    pub(crate) framebuffer: Framebuffer,
    /// Hex keypad, true while held
    pub(crate) keypad: [bool; 16],
    /// Most recently fetched instruction word
    pub(crate) opcode: u16,
    /// Keys already held when FX0A started waiting
    pub(crate) key_wait: Option<[bool; 16]>,
    /// Glyph table copied into memory on every initialize
    font: [u8; 80],
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

impl Machine {
    pub fn new() -> Machine {
        let mut machine = Machine {
            memory: Box::new([0u8; MEMORY_SIZE]),
            regs: [0u8; 16],
            index: 0,
            pc: PROGRAM_START,
            stack: [0u16; STACK_DEPTH],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            framebuffer: Framebuffer::new(),
            keypad: [false; 16],
            opcode: 0,
            key_wait: None,
            font: DEFAULT_FONT,
        };
        machine.initialize();
        machine
    }

    /// Clears memory, registers, stack, timers and display, reloads the font
    /// and points the program counter at 0x200.
    pub fn initialize(&mut self) {
        self.memory.fill(0);
        self.memory[FONT_ADDR..FONT_ADDR + self.font.len()].copy_from_slice(&self.font);
        self.regs = [0u8; 16];
        self.index = 0;
        self.pc = PROGRAM_START;
        self.stack = [0u16; STACK_DEPTH];
        self.sp = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.framebuffer.clear();
        self.keypad = [false; 16];
        self.opcode = 0;
        self.key_wait = None;
    }

    /// Copies a ROM image to 0x200. Oversized images are rejected untouched.
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), LoadError> {
        if rom.len() > MAX_PROGRAM_SIZE {
            return Err(LoadError::ProgramTooLarge {
                size: rom.len(),
                max: MAX_PROGRAM_SIZE,
            });
        }

        let start = PROGRAM_START as usize;
        self.memory[start..start + rom.len()].copy_from_slice(rom);
        debug!("loaded {} byte program at {:#05x}", rom.len(), PROGRAM_START);
        Ok(())
    }

    /// Replaces the 16 glyph font, effective immediately and on every later
    /// initialize.
    pub fn load_font(&mut self, font: &[u8]) -> Result<(), LoadError> {
        if font.len() != self.font.len() {
            return Err(LoadError::InvalidFontSize {
                size: font.len(),
                expected: self.font.len(),
            });
        }

        self.font.copy_from_slice(font);
        self.memory[FONT_ADDR..FONT_ADDR + font.len()].copy_from_slice(font);
        Ok(())
    }

    /// One 60 Hz tick: both timers count down and stop at zero.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// A tone should play while this holds.
    pub fn sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn set_delay_timer(&mut self, value: u8) {
        self.delay_timer = value;
    }

    pub fn set_sound_timer(&mut self, value: u8) {
        self.sound_timer = value;
    }

    pub fn keypad(&self) -> &[bool; 16] {
        &self.keypad
    }

    pub fn keypad_mut(&mut self) -> &mut [bool; 16] {
        &mut self.keypad
    }

    /// Presses or releases hex key `key & 0xF`.
    pub fn set_key(&mut self, key: u8, pressed: bool) {
        self.keypad[(key & 0xF) as usize] = pressed;
    }

    /// Value of `V{reg & 0xF}`.
    pub fn register(&self, reg: usize) -> u8 {
        self.regs[reg & 0xF]
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.regs
    }

    /// Writes `V{reg & 0xF}`.
    pub fn set_register(&mut self, reg: usize, value: u8) {
        self.regs[reg & 0xF] = value;
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn set_index(&mut self, value: u16) {
        self.index = value;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    /// Return addresses currently on the stack, oldest first.
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.sp as usize]
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory[..]
    }

    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub(crate) fn read_u8(&self, addr: u16) -> u8 {
        self.memory[(addr & ADDR_MASK) as usize]
    }

    pub(crate) fn write_u8(&mut self, addr: u16, data: u8) {
        self.memory[(addr & ADDR_MASK) as usize] = data;
    }

    /// Big endian word at `addr`; the second byte wraps to 0x000 past the top.
    pub(crate) fn read_u16_be(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read_u8(addr), self.read_u8(addr.wrapping_add(1))])
    }
}
