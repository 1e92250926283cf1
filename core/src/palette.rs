use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(0, 0, 0);
pub const DEFAULT_FOREGROUND: Rgb = Rgb::new(255, 255, 255);

/// 24 bit color laid out as the `r g b` byte triple of a binary PPM image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse hex color {0:?}, expected 0xRRGGBB")]
pub struct ParseRgbError(String);

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Rgb, ParseRgbError> {
        let err = || ParseRgbError(s.to_owned());
        let hex = s.strip_prefix("0x").unwrap_or(s);

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Colors used to turn framebuffer cells into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub foreground: Rgb,
    pub background: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            foreground: DEFAULT_FOREGROUND,
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl Palette {
    pub fn color(&self, cell: u8) -> Rgb {
        if cell != 0 {
            self.foreground
        } else {
            self.background
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        assert_eq!("0xAABBFF".parse::<Rgb>(), Ok(Rgb::new(0xAA, 0xBB, 0xFF)));
        assert_eq!("10ff20".parse::<Rgb>(), Ok(Rgb::new(0x10, 0xFF, 0x20)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("0xABC".parse::<Rgb>().is_err());
        assert!("GG0000".parse::<Rgb>().is_err());
        assert!("0x1234567".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_rgb_is_three_bytes() {
        let pixels = [Rgb::new(1, 2, 3), Rgb::new(4, 5, 6)];
        let bytes: &[u8] = bytemuck::cast_slice(&pixels);
        assert_eq!(bytes, &[1, 2, 3, 4, 5, 6]);
    }
}
