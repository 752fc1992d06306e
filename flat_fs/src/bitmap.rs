/// Used/free bitmap over `len` slots, packed into u64 words.
///
/// `alloc` always returns the lowest free slot, so allocation order is
/// deterministic and tests can rely on the exact indices handed out.
pub struct Bitmap {
    words: Vec<u64>,
    len: usize,
}

impl Bitmap {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0u64; (len + 63) / 64],
            len,
        }
    }

    /// First-free scan; marks the slot used. `None` when every slot is taken.
    pub fn alloc(&mut self) -> Option<usize> {
        for (word_pos, word) in self.words.iter_mut().enumerate() {
            if *word != u64::MAX {
                let inner_pos = word.trailing_ones() as usize;
                let slot = word_pos * 64 + inner_pos;
                if slot >= self.len {
                    return None;
                }
                *word |= 1u64 << inner_pos;
                return Some(slot);
            }
        }
        None
    }

    pub fn dealloc(&mut self, slot: usize) {
        let word_pos = slot / 64;
        let inner_pos = slot % 64;
        assert_ne!(self.words[word_pos] & (1u64 << inner_pos), 0);
        self.words[word_pos] ^= 1u64 << inner_pos;
    }

    pub fn is_set(&self, slot: usize) -> bool {
        self.words[slot / 64] & (1u64 << (slot % 64)) != 0
    }

    /// Drop every mark, leaving all slots free again.
    pub fn clear(&mut self) {
        for word in self.words.iter_mut() {
            *word = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }
}
