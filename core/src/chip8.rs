// CHIP-8 instruction engine
//
// Useful links:
// * [Guide to making a CHIP-8 emulator](https://tobiasvl.github.io/blog/write-a-chip-8-emulator/)
// * [Cowgod's Chip-8 Technical Reference](http://devernay.free.fr/hacks/chip8/C8TECH10.HTM)
// * [CHIP-8 extensions and compatibility](https://chip-8.github.io/extensions/)
//

use log::{debug, trace, warn};
use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::error::{Fault, LoadError};
use crate::framebuffer::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::instruction::Instruction;
use crate::machine::{Machine, FONT_ADDR, GLYPH_SIZE, STACK_DEPTH};

const VF: usize = 0xF;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    CosmacVip,
    Chip48,
    /// Same quirk set as `Chip48`
    SuperChip,
}

/// Behaviours that differ between historical interpreters.
///
/// The default set follows the plain instruction table: shifts work on VX in
/// place, FX55/FX65 leave I alone, BNNN adds V0 and sprites clip at the edge.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Quirks {
    /// 8XY6/8XYE: VY is copied into VX before shifting (COSMAC VIP)
    pub shift_reads_vy: bool,
    /// FX55/FX65: I is left pointing past the last register (COSMAC VIP)
    pub load_store_increments_index: bool,
    /// BNNN becomes BXNN: jump to XNN plus VX (CHIP-48 and SUPER-CHIP)
    pub jump_offset_uses_vx: bool,
    /// DXYN: sprite pixels crossing the right or bottom edge wrap around
    pub wrap_sprites: bool,
}

impl From<Mode> for Quirks {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::CosmacVip => Quirks {
                shift_reads_vy: true,
                load_store_increments_index: true,
                ..Quirks::default()
            },
            // SUPER-CHIP 1.1 keeps the CHIP-48 behaviour for every quirk modelled here
            Mode::Chip48 | Mode::SuperChip => Quirks {
                jump_offset_uses_vx: true,
                ..Quirks::default()
            },
        }
    }
}

/// Result of one engine step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    Executed(Instruction),
    /// FX0A is still waiting, the program counter did not move
    WaitingForKey,
    /// The instruction was skipped and the program counter moved past it
    Fault(Fault),
}

/// How the program counter moves after an instruction.
enum Flow {
    Next,
    Skip,
    Jump(u16),
    Wait,
}

impl Flow {
    fn skip_if(cond: bool) -> Flow {
        if cond {
            Flow::Skip
        } else {
            Flow::Next
        }
    }
}

#[derive(Debug, Default)]
pub struct Chip8Builder {
    /// ROM
    rom: Option<Vec<u8>>,
    /// Font sprite
    font: Option<Vec<u8>>,
    // PRNG Seed
    rng_seed: Option<u64>,
    /// Quirks
    quirks: Quirks,
}

pub struct Chip8 {
    machine: Machine,
    quirks: Quirks,
    /// PRNG Generator
    rng: StdRng,
    /// ROM image, reloaded by `reset`
    rom: Vec<u8>,
    faults: u64,
}

impl Chip8Builder {
    pub fn new() -> Chip8Builder {
        Chip8Builder::default()
    }

    pub fn with_rom(mut self, rom: Vec<u8>) -> Self {
        self.rom = Some(rom);
        self
    }

    pub fn with_font(mut self, font: Vec<u8>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.quirks = Quirks::from(mode);
        self
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn build(&self) -> Result<Chip8, LoadError> {
        let mut machine = Machine::new();

        if let Some(font) = &self.font {
            machine.load_font(font)?;
        }

        let rom = self.rom.clone().unwrap_or_default();
        machine.load_program(&rom)?;

        // Pseudo random number generator
        let rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        debug!("built CHIP-8 with {:?}", self.quirks);

        Ok(Chip8 {
            machine,
            quirks: self.quirks,
            rng,
            rom,
            faults: 0,
        })
    }
}

impl Chip8 {
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// Number of faults raised since the last reset.
    pub fn fault_count(&self) -> u64 {
        self.faults
    }

    /// Re-initializes the machine and reloads the ROM it was built with.
    pub fn reset(&mut self) -> Result<(), LoadError> {
        self.machine.initialize();
        self.machine.load_program(&self.rom)?;
        self.faults = 0;
        debug!("reset");
        Ok(())
    }

    /// Decrements the delay and sound timers; call at 60 Hz.
    pub fn tick_timers(&mut self) {
        self.machine.tick_timers();
    }

    /// Reads the word at the program counter into the current opcode.
    pub fn fetch(&mut self) {
        self.machine.opcode = self.machine.read_u16_be(self.machine.pc);
    }

    /// Fetches and executes one instruction.
    pub fn step(&mut self) -> Step {
        self.fetch();
        self.execute()
    }

    /// Executes the most recently fetched opcode.
    pub fn execute(&mut self) -> Step {
        let pc = self.machine.pc;
        let opcode = self.machine.opcode;

        let result = match Instruction::decode(opcode) {
            Some(inst) => {
                trace!("{:#05x}: {:04x} {}", pc, opcode, inst);
                self.run(inst).map(|flow| (inst, flow))
            }
            None => Err(Fault::UnknownOpcode { opcode, addr: pc }),
        };

        match result {
            Ok((_, Flow::Wait)) => Step::WaitingForKey,
            Ok((inst, flow)) => {
                self.machine.pc = match flow {
                    Flow::Next => pc.wrapping_add(2),
                    Flow::Skip => pc.wrapping_add(4),
                    Flow::Jump(addr) => addr,
                    Flow::Wait => pc,
                };
                Step::Executed(inst)
            }
            Err(fault) => {
                warn!("{}", fault);
                self.faults += 1;
                self.machine.pc = pc.wrapping_add(2);
                Step::Fault(fault)
            }
        }
    }

    fn run(&mut self, inst: Instruction) -> Result<Flow, Fault> {
        use Instruction::*;

        let m = &mut self.machine;
        let flow = match inst {
            // 00E0: Clear screen
            ClearScreen => {
                m.framebuffer.clear();
                Flow::Next
            }
            // 00EE: Return from subroutine; resume after the call
            Return => {
                if m.sp == 0 {
                    return Err(Fault::StackUnderflow { addr: m.pc });
                }
                m.sp -= 1;
                Flow::Jump(m.stack[m.sp as usize].wrapping_add(2))
            }
            // 1NNN: Jump to NNN
            Jump { addr } => Flow::Jump(addr),
            // 2NNN: Push the address of this call, jump to NNN
            Call { addr } => {
                if m.sp as usize >= STACK_DEPTH {
                    return Err(Fault::StackOverflow { addr: m.pc });
                }
                m.stack[m.sp as usize] = m.pc;
                m.sp += 1;
                Flow::Jump(addr)
            }
            SkipEqImm { x, nn } => Flow::skip_if(m.regs[x as usize] == nn),
            SkipNeImm { x, nn } => Flow::skip_if(m.regs[x as usize] != nn),
            SkipEqReg { x, y } => Flow::skip_if(m.regs[x as usize] == m.regs[y as usize]),
            SkipNeReg { x, y } => Flow::skip_if(m.regs[x as usize] != m.regs[y as usize]),
            LoadImm { x, nn } => {
                m.regs[x as usize] = nn;
                Flow::Next
            }
            AddImm { x, nn } => {
                m.regs[x as usize] = m.regs[x as usize].wrapping_add(nn);
                Flow::Next
            }
            Move { x, y } => {
                m.regs[x as usize] = m.regs[y as usize];
                Flow::Next
            }
            Or { x, y } => {
                m.regs[x as usize] |= m.regs[y as usize];
                Flow::Next
            }
            And { x, y } => {
                m.regs[x as usize] &= m.regs[y as usize];
                Flow::Next
            }
            Xor { x, y } => {
                m.regs[x as usize] ^= m.regs[y as usize];
                Flow::Next
            }
            // Flag ops write VF first and VX second, so 8FY_ keeps the result
            // rather than the flag.
            AddReg { x, y } => {
                let (res, carry) = m.regs[x as usize].overflowing_add(m.regs[y as usize]);
                m.regs[VF] = carry as u8;
                m.regs[x as usize] = res;
                Flow::Next
            }
            Sub { x, y } => {
                let (vx, vy) = (m.regs[x as usize], m.regs[y as usize]);
                m.regs[VF] = (vy <= vx) as u8;
                m.regs[x as usize] = vx.wrapping_sub(vy);
                Flow::Next
            }
            SubReversed { x, y } => {
                let (vx, vy) = (m.regs[x as usize], m.regs[y as usize]);
                m.regs[VF] = (vx <= vy) as u8;
                m.regs[x as usize] = vy.wrapping_sub(vx);
                Flow::Next
            }
            ShiftRight { x, y } => {
                let src = if self.quirks.shift_reads_vy { m.regs[y as usize] } else { m.regs[x as usize] };
                m.regs[VF] = src & 0x01;
                m.regs[x as usize] = src >> 1;
                Flow::Next
            }
            ShiftLeft { x, y } => {
                let src = if self.quirks.shift_reads_vy { m.regs[y as usize] } else { m.regs[x as usize] };
                m.regs[VF] = src >> 7;
                m.regs[x as usize] = src << 1;
                Flow::Next
            }
            LoadIndex { addr } => {
                m.index = addr;
                Flow::Next
            }
            // BNNN: Jump to NNN + V0, or XNN + VX with the quirk
            JumpOffset { addr } => {
                let offset = if self.quirks.jump_offset_uses_vx {
                    m.regs[((addr >> 8) & 0xF) as usize]
                } else {
                    m.regs[0]
                };
                Flow::Jump(addr.wrapping_add(offset as u16))
            }
            Random { x, nn } => {
                let n = self.rng.next_u32() as u8;
                m.regs[x as usize] = n & nn;
                Flow::Next
            }
            Draw { x, y, n } => {
                let (ox, oy) = (m.regs[x as usize] as usize, m.regs[y as usize] as usize);
                let collided = draw_sprite(m, ox, oy, n, self.quirks.wrap_sprites);
                m.regs[VF] = collided as u8;
                Flow::Next
            }
            SkipKeyPressed { x } => Flow::skip_if(m.keypad[(m.regs[x as usize] & 0xF) as usize]),
            SkipKeyReleased { x } => Flow::skip_if(!m.keypad[(m.regs[x as usize] & 0xF) as usize]),
            LoadDelay { x } => {
                m.regs[x as usize] = m.delay_timer;
                Flow::Next
            }
            // FX0A: Wait for a key that was up when the wait began to go down
            WaitKey { x } => {
                let keys = m.keypad;
                let held = m.key_wait.get_or_insert(keys);

                // A released key can count again once it is pressed
                for (h, &k) in held.iter_mut().zip(keys.iter()) {
                    *h &= k;
                }

                match (0..16).find(|&k| keys[k] && !held[k]) {
                    Some(key) => {
                        m.regs[x as usize] = key as u8;
                        m.key_wait = None;
                        Flow::Next
                    }
                    None => Flow::Wait,
                }
            }
            SetDelay { x } => {
                m.delay_timer = m.regs[x as usize];
                Flow::Next
            }
            SetSound { x } => {
                m.sound_timer = m.regs[x as usize];
                Flow::Next
            }
            AddIndex { x } => {
                m.index = m.index.wrapping_add(m.regs[x as usize] as u16);
                m.regs[VF] = (m.index > 0x0FFF) as u8;
                Flow::Next
            }
            LoadGlyph { x } => {
                m.index = FONT_ADDR as u16 + m.regs[x as usize] as u16 * GLYPH_SIZE as u16;
                Flow::Next
            }
            // FX33: Hundreds, tens and ones of VX at I, I+1, I+2
            StoreBcd { x } => {
                let v = m.regs[x as usize];
                let i = m.index;
                m.write_u8(i, v / 100);
                m.write_u8(i.wrapping_add(1), (v / 10) % 10);
                m.write_u8(i.wrapping_add(2), v % 10);
                Flow::Next
            }
            StoreRegisters { x } => {
                for r in 0..=x as u16 {
                    m.write_u8(m.index.wrapping_add(r), m.regs[r as usize]);
                }
                if self.quirks.load_store_increments_index {
                    m.index = m.index.wrapping_add(x as u16 + 1);
                }
                Flow::Next
            }
            LoadRegisters { x } => {
                for r in 0..=x as u16 {
                    m.regs[r as usize] = m.read_u8(m.index.wrapping_add(r));
                }
                if self.quirks.load_store_increments_index {
                    m.index = m.index.wrapping_add(x as u16 + 1);
                }
                Flow::Next
            }
        };
        Ok(flow)
    }
}

/// XORs an 8xN sprite from memory at I onto the screen at `(ox, oy)`.
///
/// The origin wraps to the screen size. Pixels past the right or bottom edge
/// are clipped, or wrapped when `wrap` is set. Returns true if any lit pixel
/// was turned off.
fn draw_sprite(m: &mut Machine, ox: usize, oy: usize, n: u8, wrap: bool) -> bool {
    let ox = ox % SCREEN_WIDTH;
    let oy = oy % SCREEN_HEIGHT;
    let mut collided = false;

    for row in 0..n as usize {
        let mut y = oy + row;
        if y >= SCREEN_HEIGHT {
            if !wrap {
                break;
            }
            y %= SCREEN_HEIGHT;
        }

        // Read row(8-bit) of sprite data from memory
        let data = m.read_u8(m.index.wrapping_add(row as u16));

        for column in 0..8 {
            if data & (0x80 >> column) == 0 {
                continue;
            }

            let mut x = ox + column;
            if x >= SCREEN_WIDTH {
                if !wrap {
                    break;
                }
                x %= SCREEN_WIDTH;
            }

            collided |= m.framebuffer.toggle(x, y);
        }
    }

    m.framebuffer.set_draw_pending(true);
    collided
}
