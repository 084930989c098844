//! Vertex-to-partition assignment.
//!
//! A [`PartitionMap`] records the owning partition of every global vertex id.
//! It is computed once at load time, shared read-only by all fragments, and is
//! the authority `Fragment::resolve` consults for ids that are not local.

pub mod metrics;

pub use self::metrics::{edge_cut, replication_factor};

use crate::engine_error::EngineError;
use crate::topology::vertex::{PartitionId, VertexId};
use hashbrown::HashMap;
use std::hash::{BuildHasher, Hasher};

/// Options shared by the built-in partitioners.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PartitionerConfig {
    pub n_parts: usize,
    /// Seed for hash-based placement; fixed so runs are reproducible.
    pub rng_seed: u64,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        Self {
            n_parts: 2,
            rng_seed: 42,
        }
    }
}

impl PartitionerConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.n_parts == 0 {
            return Err(EngineError::Configuration(
                "partition count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Owner of every vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionMap {
    owners: HashMap<VertexId, PartitionId>,
    n_parts: usize,
}

impl PartitionMap {
    pub fn with_capacity(n_parts: usize, cap: usize) -> Self {
        Self {
            owners: HashMap::with_capacity(cap),
            n_parts,
        }
    }

    pub fn insert(&mut self, v: VertexId, p: PartitionId) {
        self.owners.insert(v, p);
    }

    #[inline]
    pub fn get(&self, v: VertexId) -> Option<PartitionId> {
        self.owners.get(&v).copied()
    }

    /// Owner of `v`, or `UnknownVertex`.
    #[inline]
    pub fn owner(&self, v: VertexId) -> Result<PartitionId, EngineError> {
        self.get(v).ok_or(EngineError::UnknownVertex(v))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn n_parts(&self) -> usize {
        self.n_parts
    }

    pub fn iter(&self) -> impl Iterator<Item = (VertexId, PartitionId)> + '_ {
        self.owners.iter().map(|(&v, &p)| (v, p))
    }

    /// Check that every owner lies in `0..n_parts`.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.n_parts == 0 {
            return Err(EngineError::Configuration(
                "partition map has zero partitions".into(),
            ));
        }
        if let Some((v, p)) = self.iter().find(|&(_, p)| p >= self.n_parts) {
            return Err(EngineError::Configuration(format!(
                "vertex {v} assigned to partition {p}, but only {} exist",
                self.n_parts
            )));
        }
        Ok(())
    }
}

/// Strategy assigning vertices to partitions.
pub trait Partitioner {
    /// `vertices` is sorted and free of duplicates.
    fn assign(&self, vertices: &[VertexId], n_parts: usize) -> PartitionMap;
}

/// Contiguous blocks of the sorted id sequence, sizes differing by at most one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangePartitioner;

impl Partitioner for RangePartitioner {
    fn assign(&self, vertices: &[VertexId], n_parts: usize) -> PartitionMap {
        let mut map = PartitionMap::with_capacity(n_parts, vertices.len());
        if n_parts == 0 {
            return map;
        }
        let base = vertices.len() / n_parts;
        let extra = vertices.len() % n_parts;
        let mut it = vertices.iter();
        for p in 0..n_parts {
            let take = base + usize::from(p < extra);
            for &v in it.by_ref().take(take) {
                map.insert(v, p);
            }
        }
        map
    }
}

/// Seeded hash placement.
#[derive(Debug, Clone)]
pub struct HashPartitioner {
    state: ahash::RandomState,
}

impl HashPartitioner {
    pub fn new(seed: u64) -> Self {
        Self {
            state: ahash::RandomState::with_seeds(
                seed,
                seed ^ 0x9e37_79b9,
                0x85eb_ca6b,
                0xc2b2_ae35,
            ),
        }
    }

    pub fn from_config(cfg: &PartitionerConfig) -> Self {
        Self::new(cfg.rng_seed)
    }
}

impl Default for HashPartitioner {
    fn default() -> Self {
        Self::from_config(&PartitionerConfig::default())
    }
}

impl Partitioner for HashPartitioner {
    fn assign(&self, vertices: &[VertexId], n_parts: usize) -> PartitionMap {
        let mut map = PartitionMap::with_capacity(n_parts, vertices.len());
        if n_parts == 0 {
            return map;
        }
        for &v in vertices {
            let mut h = self.state.build_hasher();
            h.write_u64(v.get());
            map.insert(v, (h.finish() % n_parts as u64) as usize);
        }
        map
    }
}

/// Use a precomputed assignment as is.
impl Partitioner for PartitionMap {
    fn assign(&self, _vertices: &[VertexId], _n_parts: usize) -> PartitionMap {
        self.clone()
    }
}
