//! # VE.Direct Block Encoder
//!
//! Builds checksum-valid text blocks, e.g. to replay device traffic or to
//! exercise the decoder.

use super::checksum::Checksum;
use super::protocol::*;

/// Encode one `label \t value \n` record
pub fn encode_record(label: &str, value: &str) -> Vec<u8> {
    let mut record = Vec::with_capacity(label.len() + value.len() + 2);
    record.extend_from_slice(label.as_bytes());
    record.push(LABEL_TERMINATOR);
    record.extend_from_slice(value.as_bytes());
    record.push(VALUE_TERMINATOR);
    record
}

/// Encode a complete block terminated by a `Checksum` record
///
/// # Arguments
///
/// * `fields` - `(label, value)` pairs in transmission order
///
/// # Returns
///
/// * `Vec<u8>` - Block bytes whose wrapping sum is zero
///
/// # Examples
///
/// ```
/// use vedirect_bridge::vedirect::encoder::encode_block;
///
/// let block = encode_block(&[("V", "12800")]);
/// assert!(block.starts_with(b"V\t12800\nChecksum\t"));
/// assert_eq!(block.iter().fold(0u8, |sum, b| sum.wrapping_add(*b)), 0);
/// ```
pub fn encode_block(fields: &[(&str, &str)]) -> Vec<u8> {
    encode(fields, false)
}

/// Same as [`encode_block`] but with `\r\n` line endings
pub fn encode_block_crlf(fields: &[(&str, &str)]) -> Vec<u8> {
    encode(fields, true)
}

fn encode(fields: &[(&str, &str)], crlf: bool) -> Vec<u8> {
    let mut block = Vec::new();

    for (label, value) in fields {
        block.extend_from_slice(label.as_bytes());
        block.push(LABEL_TERMINATOR);
        block.extend_from_slice(value.as_bytes());
        if crlf {
            block.push(CARRIAGE_RETURN);
        }
        block.push(VALUE_TERMINATOR);
    }

    block.extend_from_slice(CHECKSUM_LABEL.as_bytes());
    block.push(LABEL_TERMINATOR);

    let mut sum = Checksum::new();
    sum.extend(&block);
    if crlf {
        sum.update(CARRIAGE_RETURN);
    }
    sum.update(VALUE_TERMINATOR);

    block.push(0u8.wrapping_sub(sum.value()));
    if crlf {
        block.push(CARRIAGE_RETURN);
    }
    block.push(VALUE_TERMINATOR);

    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(data: &[u8]) -> u8 {
        let mut checksum = Checksum::new();
        checksum.extend(data);
        checksum.value()
    }

    #[test]
    fn test_encode_record() {
        assert_eq!(encode_record("V", "12800"), b"V\t12800\n");
    }

    #[test]
    fn test_empty_block() {
        let block = encode_block(&[]);
        assert!(block.starts_with(b"Checksum\t"));
        assert_eq!(block.len(), 11);
        assert_eq!(sum(&block), 0);
    }

    #[test]
    fn test_block_sums_to_zero() {
        let block = encode_block(&[("V", "12800"), ("I", "-150"), ("LOAD", "ON")]);
        assert_eq!(sum(&block), 0);
        assert_eq!(*block.last().unwrap(), VALUE_TERMINATOR);
    }

    #[test]
    fn test_crlf_block_sums_to_zero() {
        let block = encode_block_crlf(&[("V", "12800"), ("PID", "0x203")]);
        assert!(block.starts_with(b"V\t12800\r\nPID\t0x203\r\n"));
        assert!(block.ends_with(b"\r\n"));
        assert_eq!(sum(&block), 0);
    }
}
