//! Data module: per-vertex value storage.

pub mod atomic;
pub mod double_buffer;
pub mod store;
pub mod vertex_array;

pub use atomic::{AtomicArray, AtomicScalar};
pub use double_buffer::DoubleBuffer;
pub use store::{Buffering, VertexDataStore};
pub use vertex_array::VertexArray;
