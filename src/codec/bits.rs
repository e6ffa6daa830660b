/// MSB-first bit reader.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    buf: u32,
    avail: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buf: 0,
            avail: 0,
        }
    }

    /// Read `n` bits (at most 16), or [`None`] once the input is exhausted.
    pub fn read_bits(&mut self, n: u32) -> Option<u32> {
        debug_assert!(n <= 16);
        while self.avail < n {
            let byte = *self.data.get(self.pos)?;
            self.pos += 1;
            self.buf = (self.buf << 8) | byte as u32;
            self.avail += 8;
        }
        self.avail -= n;
        let value = (self.buf >> self.avail) & ((1 << n) - 1);
        self.buf &= (1 << self.avail) - 1;
        Some(value)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.read_bits(8).map(|v| v as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_across_byte_boundaries() {
        let data = [0b1011_0011, 0b0101_1100];
        let mut bits = BitReader::new(&data);
        assert_eq!(bits.read_bits(1), Some(1));
        assert_eq!(bits.read_bits(3), Some(0b011));
        assert_eq!(bits.read_bits(8), Some(0b0011_0101));
        assert_eq!(bits.read_bits(4), Some(0b1100));
        assert_eq!(bits.read_bits(1), None);
    }

    #[test]
    fn zero_width_read_consumes_nothing() {
        let mut bits = BitReader::new(&[]);
        assert_eq!(bits.read_bits(0), Some(0));
        assert_eq!(bits.read_u8(), None);
    }
}
