//! Bit-packed masks

/// Packed binary mask used for edge maps and morphology results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// Create an all-zero mask with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Build a mask from a per-pixel predicate
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut matrix = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    matrix.set(x, y, true);
                }
            }
        }
        matrix
    }

    /// Mask width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Mask height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get bit at (x, y); out-of-bounds reads are false
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        (self.data[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Signed lookup used by neighbourhood walks
    pub fn get_signed(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.get(x as usize, y as usize)
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        if value {
            self.data[byte_index] |= 1 << bit_index;
        } else {
            self.data[byte_index] &= !(1 << bit_index);
        }
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Clear all bits to 0
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Get raw data as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
