//! Engine-owned per-vertex values of a program.
//!
//! A program declares how its values are buffered:
//! - [`Buffering::Double`]: a [`DoubleBuffer`]; reads see the pre-round
//!   snapshot, writes land in the next buffer, the program calls
//!   [`VertexDataStore::swap`] once the round's values are written.
//! - [`Buffering::InPlace`]: an [`AtomicArray`]; reads and writes hit the same
//!   cells and concurrent updates go through atomic min/add.

use super::atomic::{AtomicArray, AtomicScalar};
use super::double_buffer::DoubleBuffer;
use crate::engine_error::EngineError;
use crate::topology::vertex::LocalId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Buffering {
    Double,
    InPlace,
}

#[derive(Debug)]
pub enum VertexDataStore<T: AtomicScalar> {
    Double(DoubleBuffer<T>),
    InPlace(AtomicArray<T>),
}

impl<T: AtomicScalar> VertexDataStore<T> {
    pub fn new(buffering: Buffering, len: usize, init: T) -> Self {
        match buffering {
            Buffering::Double => VertexDataStore::Double(DoubleBuffer::new(len, init)),
            Buffering::InPlace => VertexDataStore::InPlace(AtomicArray::new(len, init)),
        }
    }

    pub fn buffering(&self) -> Buffering {
        match self {
            VertexDataStore::Double(_) => Buffering::Double,
            VertexDataStore::InPlace(_) => Buffering::InPlace,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VertexDataStore::Double(b) => b.len(),
            VertexDataStore::InPlace(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value in the current snapshot.
    #[inline]
    pub fn get(&self, v: LocalId) -> T {
        match self {
            VertexDataStore::Double(b) => b.current()[v],
            VertexDataStore::InPlace(a) => a.get(v),
        }
    }

    /// Round write: next buffer when double-buffered.
    #[inline]
    pub fn set(&mut self, v: LocalId, value: T) {
        match self {
            VertexDataStore::Double(b) => b.next_mut()[v] = value,
            VertexDataStore::InPlace(a) => a.set(v, value),
        }
    }

    /// Write into the visible snapshot.
    #[inline]
    pub fn set_current(&mut self, v: LocalId, value: T) {
        match self {
            VertexDataStore::Double(b) => b.current_mut()[v] = value,
            VertexDataStore::InPlace(a) => a.set(v, value),
        }
    }

    /// Promote next to current; no-op in place.
    pub fn swap(&mut self) {
        if let VertexDataStore::Double(b) = self {
            b.swap();
        }
    }

    pub fn try_double_mut(&mut self) -> Result<&mut DoubleBuffer<T>, EngineError> {
        match self {
            VertexDataStore::Double(b) => Ok(b),
            VertexDataStore::InPlace(_) => Err(EngineError::Configuration(
                "program needs double-buffered values".into(),
            )),
        }
    }

    pub fn try_in_place(&self) -> Result<&AtomicArray<T>, EngineError> {
        match self {
            VertexDataStore::InPlace(a) => Ok(a),
            VertexDataStore::Double(_) => Err(EngineError::Configuration(
                "program needs in-place atomic values".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_writes_are_invisible_until_swap() {
        let mut s = VertexDataStore::new(Buffering::Double, 2, 1.0_f64);
        let v = LocalId::new(0);
        s.set(v, 5.0);
        assert_eq!(s.get(v), 1.0);
        s.swap();
        assert_eq!(s.get(v), 5.0);
        assert!(s.try_in_place().is_err());
    }

    #[test]
    fn in_place_writes_are_immediate() {
        let mut s = VertexDataStore::new(Buffering::InPlace, 2, 9_u64);
        let v = LocalId::new(1);
        s.set(v, 4);
        assert_eq!(s.get(v), 4);
        s.swap();
        assert_eq!(s.get(v), 4);
        assert!(s.try_in_place().unwrap().fetch_min(v, 2));
        assert!(s.try_double_mut().is_err());
    }
}
