//! Append-only PCM byte buffer.

use crate::error::{DeltawavError, Result};

/// Raw little-endian PCM bytes in arrival order.
///
/// Only the assembler can append; everyone else sees a read-only view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcmBuffer {
    bytes: Vec<u8>,
}

impl PcmBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, fragment: &[u8]) {
        self.bytes.extend_from_slice(fragment);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hand the bytes to the caller without copying.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Fail if the buffer ends on half a 16-bit sample.
    ///
    /// # Errors
    /// `DeltawavError::OddPcmLength` with the offset of the dangling byte.
    pub fn ensure_whole_samples(&self) -> Result<()> {
        if self.bytes.len() % 2 != 0 {
            return Err(DeltawavError::OddPcmLength {
                len: self.bytes.len(),
                offset: self.bytes.len() - 1,
            });
        }
        Ok(())
    }

    /// Interpret the bytes as little-endian signed 16-bit samples.
    ///
    /// A trailing odd byte is not yielded; call `ensure_whole_samples` first
    /// when that matters.
    pub fn samples_i16(&self) -> impl Iterator<Item = i16> + '_ {
        self.bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }
}

impl From<Vec<u8>> for PcmBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl AsRef<[u8]> for PcmBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut buf = PcmBuffer::new();
        buf.append(&[1, 2]);
        buf.append(&[]);
        buf.append(&[3, 4, 5, 6]);
        assert_eq!(buf.as_bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn samples_are_little_endian_signed() {
        let buf = PcmBuffer::from(vec![0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80]);
        let samples: Vec<i16> = buf.samples_i16().collect();
        assert_eq!(samples, vec![1, -1, i16::MIN]);
    }

    #[test]
    fn odd_length_is_rejected() {
        let buf = PcmBuffer::from(vec![0u8; 3]);
        match buf.ensure_whole_samples() {
            Err(DeltawavError::OddPcmLength { len, offset }) => {
                assert_eq!(len, 3);
                assert_eq!(offset, 2);
            }
            other => panic!("expected OddPcmLength, got {other:?}"),
        }
        assert!(PcmBuffer::new().ensure_whole_samples().is_ok());
    }
}
