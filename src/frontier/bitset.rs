//! Dense bitset over `AtomicU64` words, settable through `&self`.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct AtomicBitset {
    words: Vec<AtomicU64>,
    len: usize,
}

impl AtomicBitset {
    pub fn with_size(n: usize) -> Self {
        Self {
            words: (0..n.div_ceil(64)).map(|_| AtomicU64::new(0)).collect(),
            len: n,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Set bit `i`; `true` if this call flipped it.
    #[inline]
    pub fn set(&self, i: usize) -> bool {
        let mask = 1u64 << (i % 64);
        self.words[i / 64].fetch_or(mask, Ordering::AcqRel) & mask == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        (self.words[i / 64].load(Ordering::Acquire) >> (i % 64)) & 1 == 1
    }

    #[inline]
    pub fn clear_bit(&mut self, i: usize) {
        *self.words[i / 64].get_mut() &= !(1u64 << (i % 64));
    }

    pub fn clear_all(&mut self) {
        for w in &mut self.words {
            *w.get_mut() = 0;
        }
    }

    /// Set every bit of `range`; returns how many were newly set.
    pub fn set_range(&self, range: Range<usize>) -> usize {
        let mut added = 0;
        let mut i = range.start;
        while i < range.end {
            let word = i / 64;
            let lo = i % 64;
            let hi = (range.end - word * 64).min(64);
            let mask = word_mask(lo, hi);
            let old = self.words[word].fetch_or(mask, Ordering::AcqRel);
            added += (mask & !old).count_ones() as usize;
            i = (word + 1) * 64;
        }
        added
    }

    /// `true` if no bit of `range` is set.
    pub fn none_in(&self, range: Range<usize>) -> bool {
        let mut i = range.start;
        while i < range.end {
            let word = i / 64;
            let lo = i % 64;
            let hi = (range.end - word * 64).min(64);
            if self.words[word].load(Ordering::Acquire) & word_mask(lo, hi) != 0 {
                return false;
            }
            i = (word + 1) * 64;
        }
        true
    }

    /// Set bits of `range`, ascending.
    pub fn ones_in(&self, range: Range<usize>) -> Vec<usize> {
        let mut out = Vec::new();
        let mut i = range.start;
        while i < range.end {
            let word = i / 64;
            let lo = i % 64;
            let hi = (range.end - word * 64).min(64);
            let mut bits = self.words[word].load(Ordering::Acquire) & word_mask(lo, hi);
            while bits != 0 {
                let b = bits.trailing_zeros() as usize;
                out.push(word * 64 + b);
                bits &= bits - 1;
            }
            i = (word + 1) * 64;
        }
        out
    }
}

/// Bits `lo..hi` of a word.
#[inline]
fn word_mask(lo: usize, hi: usize) -> u64 {
    let upper = if hi >= 64 { u64::MAX } else { (1u64 << hi) - 1 };
    upper & !((1u64 << lo) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reports_first_setter_only() {
        let b = AtomicBitset::with_size(130);
        assert!(b.set(129));
        assert!(!b.set(129));
        assert!(b.get(129));
        assert!(!b.get(128));
    }

    #[test]
    fn range_ops_cross_word_boundaries() {
        let b = AtomicBitset::with_size(200);
        assert_eq!(b.set_range(60..70), 10);
        assert_eq!(b.set_range(65..72), 2);
        assert!(b.none_in(0..60));
        assert!(!b.none_in(0..61));
        assert!(b.none_in(72..200));
        assert_eq!(b.ones_in(68..130), vec![68, 69, 70, 71]);
    }

    #[test]
    fn clear_resets() {
        let mut b = AtomicBitset::with_size(70);
        b.set(3);
        b.set(66);
        b.clear_bit(3);
        assert!(!b.get(3));
        b.clear_all();
        assert!(b.none_in(0..70));
    }
}
