//! Parameter types for image operations.
//!
//! These structs describe *what* to encode, not *how*. They are the interface
//! between the ensurer in [`process`](crate::process) (which decides which
//! variants are missing) and the [`backend`](super::backend) (which does the
//! actual pixel or subprocess work). Either backend consumes the same
//! [`EncodeParams`].

use super::backend::Dimensions;
use crate::types::OutputFormat;

/// Quality setting for lossy image encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// AVIF encoder speed (0 = slowest/best, 10 = fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speed(u8);

impl Speed {
    pub fn new(value: u32) -> Self {
        Self(value.min(10) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(6)
    }
}

/// Everything a backend needs to produce one variant from a decoded source.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    /// Final pixel dimensions. Equal to the source dimensions means no resize.
    pub target: Dimensions,
    pub quality: Quality,
    /// Only consulted for AVIF.
    pub speed: Speed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 0);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn speed_clamps_to_ten() {
        assert_eq!(Speed::new(3).value(), 3);
        assert_eq!(Speed::new(42).value(), 10);
        assert_eq!(Speed::default().value(), 6);
    }
}
