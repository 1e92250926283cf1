use std::fmt;

/// A decoded CHIP-8 instruction.
///
/// Register operands are nibble indices (`0x0..=0xF`), addresses are 12 bit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump { addr: u16 },
    /// 2NNN
    Call { addr: u16 },
    /// 3XNN
    SkipEqImm { x: u8, nn: u8 },
    /// 4XNN
    SkipNeImm { x: u8, nn: u8 },
    /// 5XY0
    SkipEqReg { x: u8, y: u8 },
    /// 6XNN
    LoadImm { x: u8, nn: u8 },
    /// 7XNN
    AddImm { x: u8, nn: u8 },
    /// 8XY0
    Move { x: u8, y: u8 },
    /// 8XY1
    Or { x: u8, y: u8 },
    /// 8XY2
    And { x: u8, y: u8 },
    /// 8XY3
    Xor { x: u8, y: u8 },
    /// 8XY4
    AddReg { x: u8, y: u8 },
    /// 8XY5
    Sub { x: u8, y: u8 },
    /// 8XY6
    ShiftRight { x: u8, y: u8 },
    /// 8XY7
    SubReversed { x: u8, y: u8 },
    /// 8XYE
    ShiftLeft { x: u8, y: u8 },
    /// 9XY0
    SkipNeReg { x: u8, y: u8 },
    /// ANNN
    LoadIndex { addr: u16 },
    /// BNNN
    JumpOffset { addr: u16 },
    /// CXNN
    Random { x: u8, nn: u8 },
    /// DXYN
    Draw { x: u8, y: u8, n: u8 },
    /// EX9E
    SkipKeyPressed { x: u8 },
    /// EXA1
    SkipKeyReleased { x: u8 },
    /// FX07
    LoadDelay { x: u8 },
    /// FX0A
    WaitKey { x: u8 },
    /// FX15
    SetDelay { x: u8 },
    /// FX18
    SetSound { x: u8 },
    /// FX1E
    AddIndex { x: u8 },
    /// FX29
    LoadGlyph { x: u8 },
    /// FX33
    StoreBcd { x: u8 },
    /// FX55
    StoreRegisters { x: u8 },
    /// FX65
    LoadRegisters { x: u8 },
}

impl Instruction {
    /// Decodes a 16 bit instruction word, `None` for unassigned encodings.
    pub fn decode(opcode: u16) -> Option<Instruction> {
        // Instruction split into nibbles
        let family = (opcode >> 12) as u8;
        let x = ((opcode >> 8) & 0xF) as u8;
        let y = ((opcode >> 4) & 0xF) as u8;
        let n = (opcode & 0xF) as u8;
        let nn = (opcode & 0xFF) as u8;
        let addr = opcode & 0x0FFF;

        let inst = match family {
            0x0 => match addr {
                0x0E0 => Instruction::ClearScreen,
                0x0EE => Instruction::Return,
                _ => return None,
            },
            0x1 => Instruction::Jump { addr },
            0x2 => Instruction::Call { addr },
            0x3 => Instruction::SkipEqImm { x, nn },
            0x4 => Instruction::SkipNeImm { x, nn },
            0x5 if n == 0 => Instruction::SkipEqReg { x, y },
            0x6 => Instruction::LoadImm { x, nn },
            0x7 => Instruction::AddImm { x, nn },
            0x8 => match n {
                0x0 => Instruction::Move { x, y },
                0x1 => Instruction::Or { x, y },
                0x2 => Instruction::And { x, y },
                0x3 => Instruction::Xor { x, y },
                0x4 => Instruction::AddReg { x, y },
                0x5 => Instruction::Sub { x, y },
                0x6 => Instruction::ShiftRight { x, y },
                0x7 => Instruction::SubReversed { x, y },
                0xE => Instruction::ShiftLeft { x, y },
                _ => return None,
            },
            0x9 if n == 0 => Instruction::SkipNeReg { x, y },
            0xA => Instruction::LoadIndex { addr },
            0xB => Instruction::JumpOffset { addr },
            0xC => Instruction::Random { x, nn },
            0xD => Instruction::Draw { x, y, n },
            0xE => match nn {
                0x9E => Instruction::SkipKeyPressed { x },
                0xA1 => Instruction::SkipKeyReleased { x },
                _ => return None,
            },
            0xF => match nn {
                0x07 => Instruction::LoadDelay { x },
                0x0A => Instruction::WaitKey { x },
                0x15 => Instruction::SetDelay { x },
                0x18 => Instruction::SetSound { x },
                0x1E => Instruction::AddIndex { x },
                0x29 => Instruction::LoadGlyph { x },
                0x33 => Instruction::StoreBcd { x },
                0x55 => Instruction::StoreRegisters { x },
                0x65 => Instruction::LoadRegisters { x },
                _ => return None,
            },
            _ => return None,
        };
        Some(inst)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { addr } => write!(f, "JP {:#05x}", addr),
            Call { addr } => write!(f, "CALL {:#05x}", addr),
            SkipEqImm { x, nn } => write!(f, "SE V{:X}, {:#04x}", x, nn),
            SkipNeImm { x, nn } => write!(f, "SNE V{:X}, {:#04x}", x, nn),
            SkipEqReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LoadImm { x, nn } => write!(f, "LD V{:X}, {:#04x}", x, nn),
            AddImm { x, nn } => write!(f, "ADD V{:X}, {:#04x}", x, nn),
            Move { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x, y } => write!(f, "SHR V{:X}, V{:X}", x, y),
            SubReversed { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x, y } => write!(f, "SHL V{:X}, V{:X}", x, y),
            SkipNeReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LoadIndex { addr } => write!(f, "LD I, {:#05x}", addr),
            JumpOffset { addr } => write!(f, "JP V0, {:#05x}", addr),
            Random { x, nn } => write!(f, "RND V{:X}, {:#04x}", x, nn),
            Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            SkipKeyPressed { x } => write!(f, "SKP V{:X}", x),
            SkipKeyReleased { x } => write!(f, "SKNP V{:X}", x),
            LoadDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddIndex { x } => write!(f, "ADD I, V{:X}", x),
            LoadGlyph { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            StoreRegisters { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegisters { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}

/// Walks a ROM image two bytes at a time, yielding `(address, word, decoded)`.
///
/// A trailing odd byte is ignored.
pub fn disassemble(rom: &[u8], base: u16) -> impl Iterator<Item = (u16, u16, Option<Instruction>)> + '_ {
    rom.chunks_exact(2).enumerate().map(move |(i, pair)| {
        let word = u16::from_be_bytes([pair[0], pair[1]]);
        let addr = base.wrapping_add((i * 2) as u16);
        (addr, word, Instruction::decode(word))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_system_family() {
        assert_eq!(Instruction::decode(0x00E0), Some(Instruction::ClearScreen));
        assert_eq!(Instruction::decode(0x00EE), Some(Instruction::Return));
        assert_eq!(Instruction::decode(0x0123), None);
        assert_eq!(Instruction::decode(0x0000), None);
    }

    #[test]
    fn test_decode_operand_fields() {
        assert_eq!(
            Instruction::decode(0xDAB5),
            Some(Instruction::Draw { x: 0xA, y: 0xB, n: 5 })
        );
        assert_eq!(
            Instruction::decode(0x2ABC),
            Some(Instruction::Call { addr: 0xABC })
        );
        assert_eq!(
            Instruction::decode(0x7C42),
            Some(Instruction::AddImm { x: 0xC, nn: 0x42 })
        );
    }

    #[test]
    fn test_decode_arithmetic_family() {
        assert_eq!(Instruction::decode(0x8124), Some(Instruction::AddReg { x: 1, y: 2 }));
        assert_eq!(Instruction::decode(0x812E), Some(Instruction::ShiftLeft { x: 1, y: 2 }));
        for n in [0x8, 0x9, 0xA, 0xB, 0xC, 0xD, 0xF] {
            assert_eq!(Instruction::decode(0x8120 | n), None, "8XY{:X}", n);
        }
    }

    #[test]
    fn test_decode_register_compare_needs_zero_nibble() {
        assert_eq!(Instruction::decode(0x5120), Some(Instruction::SkipEqReg { x: 1, y: 2 }));
        assert_eq!(Instruction::decode(0x5121), None);
        assert_eq!(Instruction::decode(0x9120), Some(Instruction::SkipNeReg { x: 1, y: 2 }));
        assert_eq!(Instruction::decode(0x912F), None);
    }

    #[test]
    fn test_decode_key_and_misc_families() {
        assert_eq!(Instruction::decode(0xE39E), Some(Instruction::SkipKeyPressed { x: 3 }));
        assert_eq!(Instruction::decode(0xE3A1), Some(Instruction::SkipKeyReleased { x: 3 }));
        assert_eq!(Instruction::decode(0xE3A2), None);
        assert_eq!(Instruction::decode(0xF40A), Some(Instruction::WaitKey { x: 4 }));
        assert_eq!(Instruction::decode(0xF465), Some(Instruction::LoadRegisters { x: 4 }));
        assert_eq!(Instruction::decode(0xF475), None);
    }

    #[test]
    fn test_mnemonics() {
        let text = |op| Instruction::decode(op).unwrap().to_string();
        assert_eq!(text(0x00E0), "CLS");
        assert_eq!(text(0x12A0), "JP 0x2a0");
        assert_eq!(text(0x631F), "LD V3, 0x1f");
        assert_eq!(text(0xD125), "DRW V1, V2, 5");
        assert_eq!(text(0xFA55), "LD [I], VA");
    }

    #[test]
    fn test_disassemble_rom() {
        let rom = [0x60, 0x05, 0x01, 0x23, 0x10];
        let listing: Vec<_> = disassemble(&rom, 0x200).collect();
        assert_eq!(
            listing,
            vec![
                (0x200, 0x6005, Some(Instruction::LoadImm { x: 0, nn: 5 })),
                (0x202, 0x0123, None),
            ]
        );
    }
}
