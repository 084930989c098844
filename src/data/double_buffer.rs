//! Current/next pair of vertex arrays.
//!
//! During a round reads go to `current` and writes go to `next`; `swap`
//! exchanges the two owned buffers without touching their elements.

use super::vertex_array::VertexArray;

#[derive(Clone, Debug)]
pub struct DoubleBuffer<T> {
    current: VertexArray<T>,
    next: VertexArray<T>,
}

impl<T: Clone> DoubleBuffer<T> {
    pub fn new(len: usize, init: T) -> Self {
        Self {
            current: VertexArray::new(len, init.clone()),
            next: VertexArray::new(len, init),
        }
    }
}

impl<T> DoubleBuffer<T> {
    #[inline]
    pub fn current(&self) -> &VertexArray<T> {
        &self.current
    }

    /// Mutable access to the visible snapshot; used between rounds only
    /// (mirror refresh, post-processing).
    #[inline]
    pub fn current_mut(&mut self) -> &mut VertexArray<T> {
        &mut self.current
    }

    #[inline]
    pub fn next(&self) -> &VertexArray<T> {
        &self.next
    }

    #[inline]
    pub fn next_mut(&mut self) -> &mut VertexArray<T> {
        &mut self.next
    }

    /// Read the snapshot while writing the next round.
    #[inline]
    pub fn split_mut(&mut self) -> (&VertexArray<T>, &mut VertexArray<T>) {
        (&self.current, &mut self.next)
    }

    /// O(1): exchanges ownership of the two arrays.
    #[inline]
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
