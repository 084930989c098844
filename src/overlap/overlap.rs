//! Sharing relationships between one fragment and its peers.
//!
//! For every peer partition `p` the overlap stores two ordered lists of local
//! ids:
//! - `mirrors`: inner vertices of this fragment that appear as outer vertices
//!   on `p` (state flows *out* along these),
//! - `outer`: outer vertices of this fragment owned by `p` (state flows *in*).
//!
//! Both lists are sorted by global id on both sides, so position `i` of
//! `mirrors` on the owner matches position `i` of `outer` on the peer and
//! mirror state can travel as a bare payload array.

use crate::topology::vertex::{LocalId, PartitionId};

/// Links to one peer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerLinks {
    pub mirrors: Vec<LocalId>,
    pub outer: Vec<LocalId>,
}

impl PeerLinks {
    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty() && self.outer.is_empty()
    }
}

/// Per-peer links of one fragment, indexed by partition id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Overlap {
    peers: Vec<PeerLinks>,
}

impl Overlap {
    pub fn new(n_parts: usize) -> Self {
        Self {
            peers: vec![PeerLinks::default(); n_parts],
        }
    }

    /// Record that inner vertex `local` is mirrored on `peer`.
    pub fn add_mirror(&mut self, peer: PartitionId, local: LocalId) {
        self.peers[peer].mirrors.push(local);
    }

    /// Record that outer vertex `local` is owned by `peer`.
    pub fn add_outer(&mut self, peer: PartitionId, local: LocalId) {
        self.peers[peer].outer.push(local);
    }

    /// Peers sharing at least one vertex with this fragment, ascending.
    pub fn neighbours(&self) -> impl Iterator<Item = PartitionId> + '_ {
        self.peers
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.is_empty())
            .map(|(p, _)| p)
    }

    pub fn links_to(&self, peer: PartitionId) -> &PeerLinks {
        &self.peers[peer]
    }

    pub fn mirrors_to(&self, peer: PartitionId) -> &[LocalId] {
        &self.peers[peer].mirrors
    }

    pub fn outer_from(&self, peer: PartitionId) -> &[LocalId] {
        &self.peers[peer].outer
    }

    pub fn n_parts(&self) -> usize {
        self.peers.len()
    }
}
