use std::io;

/// Fixed-width unsigned integers packed into 64-bit words. An entry may start in one word and end
/// in the next, exactly as the chunk wire format lays them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStorage {
    data: Vec<u64>,
    bits: u8,
    len: usize,
    mask: u64,
}

impl BitStorage {
    /// Zeroed storage for `len` entries of `bits` bits each.
    pub fn new(bits: u8, len: usize) -> Self {
        Self {
            data: vec![0; Self::words_for(bits, len)],
            bits,
            len,
            mask: Self::mask_for(bits),
        }
    }

    /// Wraps words received from the wire. Fails if their count does not match the layout.
    pub fn with_data(bits: u8, len: usize, data: Vec<u64>) -> io::Result<Self> {
        let expected = Self::words_for(bits, len);
        if data.len() != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Expected {} words for {} entries of {} bits, got {}",
                    expected,
                    len,
                    bits,
                    data.len()
                ),
            ));
        }
        Ok(Self {
            data,
            bits,
            len,
            mask: Self::mask_for(bits),
        })
    }

    pub fn words_for(bits: u8, len: usize) -> usize {
        (len * bits as usize + 63) / 64
    }

    fn mask_for(bits: u8) -> u64 {
        if bits == 0 {
            0
        } else {
            (1u64 << bits) - 1
        }
    }

    pub fn get(&self, index: usize) -> u32 {
        debug_assert!(index < self.len);
        if self.bits == 0 {
            return 0;
        }
        let bits = self.bits as usize;
        let start_long = (index * bits) / 64;
        let start_offset = (index * bits) % 64;
        let end_long = ((index + 1) * bits - 1) / 64;

        let value = if start_long == end_long {
            self.data[start_long] >> start_offset
        } else {
            let end_offset = 64 - start_offset;
            (self.data[start_long] >> start_offset) | (self.data[end_long] << end_offset)
        };
        (value & self.mask) as u32
    }

    pub fn set(&mut self, index: usize, value: u32) {
        debug_assert!(index < self.len);
        debug_assert!(value as u64 <= self.mask);
        if self.bits == 0 {
            return;
        }
        let bits = self.bits as usize;
        let start_long = (index * bits) / 64;
        let start_offset = (index * bits) % 64;
        let end_long = ((index + 1) * bits - 1) / 64;
        let value = value as u64 & self.mask;

        self.data[start_long] &= !(self.mask << start_offset);
        self.data[start_long] |= value << start_offset;

        if start_long != end_long {
            let end_offset = 64 - start_offset;
            self.data[end_long] &= !(self.mask >> end_offset);
            self.data[end_long] |= value >> end_offset;
        }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn data(&self) -> &[u64] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_bits_is_empty() {
        let storage = BitStorage::new(0, 4096);
        assert!(storage.data().is_empty());
        assert_eq!(storage.get(4095), 0);
    }

    #[test]
    fn test_entries_straddle_words() {
        let mut storage = BitStorage::new(13, 4096);
        assert_eq!(storage.data().len(), 832);

        // Entry 4 occupies bits 52..65, crossing into the second word.
        storage.set(4, 0x1FFF);
        assert_eq!(storage.data()[0], 0xFFF << 52);
        assert_eq!(storage.data()[1], 0x1);
        assert_eq!(storage.get(4), 0x1FFF);
        assert_eq!(storage.get(3), 0);
        assert_eq!(storage.get(5), 0);

        storage.set(4, 0x0AAA);
        assert_eq!(storage.get(4), 0x0AAA);
    }

    #[test]
    fn test_neighbours_are_untouched() {
        for bits in [1u8, 4, 5, 7, 8, 13] {
            let max = (1u32 << bits) - 1;
            let mut storage = BitStorage::new(bits, 256);
            for i in 0..256 {
                storage.set(i, (i as u32 * 7) & max);
            }
            storage.set(100, max);
            for i in 0..256 {
                let expected = if i == 100 { max } else { (i as u32 * 7) & max };
                assert_eq!(storage.get(i), expected, "bits {} index {}", bits, i);
            }
        }
    }

    #[test]
    fn test_with_data_checks_word_count() {
        assert!(BitStorage::with_data(4, 4096, vec![0; 256]).is_ok());
        assert!(BitStorage::with_data(4, 4096, vec![0; 255]).is_err());
        assert!(BitStorage::with_data(5, 4096, vec![0; 320]).is_ok());
    }
}
