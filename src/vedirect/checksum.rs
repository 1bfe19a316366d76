//! # VE.Direct Block Checksum
//!
//! Running 8-bit sum over every byte of a block. A block is valid when the
//! sum, including the checksum byte and all terminators, wraps to zero.
//!
//! Arithmetic is explicitly modulo 256 (`u8::wrapping_add`).

/// Running checksum accumulator
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    sum: u8,
}

impl Checksum {
    /// Create an accumulator at zero
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    /// Add one byte
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.sum = self.sum.wrapping_add(byte);
    }

    /// Add a run of bytes
    pub fn extend(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Current sum modulo 256
    pub fn value(&self) -> u8 {
        self.sum
    }

    /// Whether everything summed so far forms a valid block
    pub fn is_valid(&self) -> bool {
        self.sum == 0
    }

    /// Start a new block
    pub fn reset(&mut self) {
        self.sum = 0;
    }
}

/// Compute the byte that makes `data` plus the checksum byte sum to zero
///
/// # Arguments
///
/// * `data` - Every byte of the block except the checksum byte itself
///   (the trailing `\n` after the checksum byte must be included)
///
/// # Examples
///
/// ```
/// use vedirect_bridge::vedirect::checksum::{checksum_byte, Checksum};
///
/// let data = b"V\t12800\nChecksum\t\n";
/// let k = checksum_byte(data);
///
/// let mut sum = Checksum::new();
/// sum.extend(data);
/// sum.update(k);
/// assert!(sum.is_valid());
/// ```
pub fn checksum_byte(data: &[u8]) -> u8 {
    let mut sum = Checksum::new();
    sum.extend(data);
    0u8.wrapping_sub(sum.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_valid() {
        assert!(Checksum::new().is_valid());
        assert_eq!(checksum_byte(&[]), 0);
    }

    #[test]
    fn test_wraps_modulo_256() {
        let mut sum = Checksum::new();
        sum.update(0xFF);
        sum.update(0x02);
        assert_eq!(sum.value(), 0x01);
    }

    #[test]
    fn test_reset() {
        let mut sum = Checksum::new();
        sum.extend(b"garbage");
        assert!(!sum.is_valid());
        sum.reset();
        assert!(sum.is_valid());
    }

    #[test]
    fn test_checksum_byte_closes_block() {
        let data = b"V\t12800\nI\t-150\nChecksum\t\n";
        let k = checksum_byte(data);

        let mut sum = Checksum::new();
        sum.extend(data);
        assert!(!sum.is_valid());
        sum.update(k);
        assert!(sum.is_valid(), "Checksum byte 0x{:02X} should close block", k);
    }

    #[test]
    fn test_order_independent() {
        let mut a = Checksum::new();
        a.extend(b"LOAD\tON\n");
        let mut b = Checksum::new();
        b.extend(b"\nNO\tDAOL");
        assert_eq!(a, b);
    }
}
