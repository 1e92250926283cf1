use thiserror::Error;

/// Failures reported synchronously by the loaders, before any memory is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("program is {size} bytes, at most {max} fit above 0x200")]
    ProgramTooLarge { size: usize, max: usize },
    #[error("font must be exactly {expected} bytes, got {size}")]
    InvalidFontSize { size: usize, expected: usize },
}

/// Non-fatal anomalies raised while executing a ROM.
///
/// The engine reports these and carries on with the next instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("unknown opcode {opcode:#06x} at {addr:#05x}")]
    UnknownOpcode { opcode: u16, addr: u16 },
    #[error("call at {addr:#05x} with a full stack")]
    StackOverflow { addr: u16 },
    #[error("return at {addr:#05x} with an empty stack")]
    StackUnderflow { addr: u16 },
}
