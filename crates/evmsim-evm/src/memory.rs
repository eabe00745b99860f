//! EVM memory

use primitive_types::U256;

/// Byte-addressable memory that grows in 32-byte words and never shrinks
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Current size in bytes, always a multiple of 32
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Size after touching `[offset, offset + size)`, word aligned
    ///
    /// Touching zero bytes never grows memory.
    pub fn required_size(&self, offset: usize, size: usize) -> usize {
        if size == 0 {
            return self.data.len();
        }
        let end = offset.saturating_add(size);
        let aligned = end.div_ceil(32).saturating_mul(32);
        aligned.max(self.data.len())
    }

    /// Grow to `new_size` bytes (no-op when already larger)
    pub fn resize(&mut self, new_size: usize) {
        if new_size > self.data.len() {
            self.data.resize(new_size, 0);
        }
    }

    /// Load a 32-byte word
    pub fn load_word(&self, offset: usize) -> U256 {
        U256::from_big_endian(&self.load_slice(offset, 32))
    }

    /// Store a 32-byte word
    pub fn store_word(&mut self, offset: usize, value: &U256) {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        self.store_slice(offset, &bytes);
    }

    /// Store a single byte
    pub fn store_byte(&mut self, offset: usize, value: u8) {
        self.resize(self.required_size(offset, 1));
        self.data[offset] = value;
    }

    /// Copy `size` bytes out, zero filled past the end
    pub fn load_slice(&self, offset: usize, size: usize) -> Vec<u8> {
        let mut result = vec![0u8; size];
        if offset < self.data.len() {
            let end = offset.saturating_add(size).min(self.data.len());
            result[..end - offset].copy_from_slice(&self.data[offset..end]);
        }
        result
    }

    /// Write bytes, growing as needed
    pub fn store_slice(&mut self, offset: usize, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.resize(self.required_size(offset, data.len()));
        self.data[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Write `size` bytes from `source[source_offset..]`, zero filling past its end
    pub fn copy_from(&mut self, offset: usize, source: &[u8], source_offset: usize, size: usize) {
        if size == 0 {
            return;
        }
        let mut chunk = vec![0u8; size];
        if source_offset < source.len() {
            let end = source_offset.saturating_add(size).min(source.len());
            chunk[..end - source_offset].copy_from_slice(&source[source_offset..end]);
        }
        self.store_slice(offset, &chunk);
    }

    /// Raw contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_size_is_word_aligned() {
        let mem = Memory::new();
        assert_eq!(mem.required_size(0, 0), 0);
        assert_eq!(mem.required_size(0, 1), 32);
        assert_eq!(mem.required_size(31, 2), 64);
        assert_eq!(mem.required_size(1000, 0), 0);
    }

    #[test]
    fn test_word_round_trip() {
        let mut mem = Memory::new();
        mem.store_word(4, &U256::from(0x1234));
        assert_eq!(mem.size(), 64);
        assert_eq!(mem.load_word(4), U256::from(0x1234));
        assert_eq!(mem.data()[35], 0x34);
    }

    #[test]
    fn test_store_byte() {
        let mut mem = Memory::new();
        mem.store_byte(40, 0xAB);
        assert_eq!(mem.size(), 64);
        assert_eq!(mem.data()[40], 0xAB);
    }

    #[test]
    fn test_load_past_end_is_zero() {
        let mut mem = Memory::new();
        mem.store_slice(0, &[1, 2, 3]);
        assert_eq!(mem.load_slice(30, 4), vec![0, 0, 0, 0]);
        assert_eq!(mem.load_slice(1, 3), vec![2, 3, 0]);
        assert_eq!(mem.load_slice(100, 2), vec![0, 0]);
    }

    #[test]
    fn test_copy_from_zero_fills() {
        let mut mem = Memory::new();
        mem.copy_from(0, &[9, 8, 7], 1, 4);
        assert_eq!(mem.load_slice(0, 4), vec![8, 7, 0, 0]);
        mem.copy_from(64, &[1], 0, 0);
        assert_eq!(mem.size(), 32);
    }

    #[test]
    fn test_never_shrinks() {
        let mut mem = Memory::new();
        mem.resize(96);
        mem.resize(32);
        assert_eq!(mem.size(), 96);
    }
}
