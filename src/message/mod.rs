//! Message manager: routes vertex updates and mirror state between partitions.
//!
//! Two kinds of traffic cross partitions:
//! - *updates* `(destination gid, M)` produced by
//!   [`MessageManager::sync_state_on_outer_vertex`] or
//!   [`MessageManager::send_to`], delivered to the owner of the destination
//!   and handed to the program through [`MessageManager::take_updates`];
//! - *mirror state* `S` of inner vertices, broadcast by
//!   [`MessageManager::sync_inner_vertices`] and written into the receivers'
//!   outer copies by [`MessageManager::update_outer_vertices`].
//!
//! Delivery is bulk synchronous in both modes: whatever is sent during round
//! *k* becomes visible in round *k + 1*, after [`MessageManager::finish_round`].
//! In [`DeliveryMode::Channel`] per-thread buffers are flushed as soon as they
//! fill up, so transfer overlaps computation; in
//! [`DeliveryMode::BatchShuffle`] everything leaves at the barrier.

pub(crate) mod batch;
pub(crate) mod channel;

pub use channel::TAG_FRAMES;

use crate::algs::collective;
use crate::algs::communicator::{Communicator, Wait};
use crate::data::{AtomicScalar, VertexDataStore};
use crate::engine_error::EngineError;
use crate::overlap::Combiner;
use crate::topology::fragment::Fragment;
use crate::topology::vertex::{LocalId, PartitionId, VertexId};
use bytemuck::Pod;
use channel::{ChannelBuffer, Frame};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// How updates travel between partitions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DeliveryMode {
    /// Buffer per destination, exchanged at the barrier.
    #[default]
    BatchShuffle,
    /// Per-thread buffers flushed once they reach the flush threshold.
    Channel,
}

pub struct MessageManager<C: Communicator, M: Pod + Send + Sync, S: AtomicScalar> {
    comm: Arc<C>,
    fid: PartitionId,
    fnum: usize,
    mode: DeliveryMode,
    flush_threshold: usize,
    combiner: Option<Combiner<M>>,
    shards: Vec<Mutex<ChannelBuffer<M>>>,
    /// Updates addressed to this partition's own vertices.
    local: Mutex<Vec<(VertexId, M)>>,
    /// Per peer: pending send handles; holding the lock keeps a frame's
    /// header and body adjacent on the wire.
    outgoing: Vec<Mutex<Vec<C::SendHandle>>>,
    inbox: Vec<(VertexId, M)>,
    mirror_in: Vec<Option<Vec<S>>>,
    sent: AtomicUsize,
    total_sent: usize,
    force: AtomicBool,
}

impl<C, M, S> MessageManager<C, M, S>
where
    C: Communicator,
    M: Pod + Send + Sync,
    S: AtomicScalar,
{
    /// `comm` must be the rank of partition `fid` in a world of `fnum` ranks.
    pub fn new(
        comm: Arc<C>,
        fid: PartitionId,
        fnum: usize,
        mode: DeliveryMode,
        flush_threshold: usize,
        combiner: Option<Combiner<M>>,
    ) -> Result<Self, EngineError> {
        if comm.size() != fnum || comm.rank() != fid {
            return Err(EngineError::Configuration(format!(
                "communicator rank {}/{} does not match fragment {fid}/{fnum}",
                comm.rank(),
                comm.size()
            )));
        }
        if flush_threshold == 0 {
            return Err(EngineError::Configuration(
                "channel flush threshold must be positive".into(),
            ));
        }
        let n_shards = rayon::current_num_threads() + 1;
        Ok(Self {
            comm,
            fid,
            fnum,
            mode,
            flush_threshold,
            combiner,
            shards: (0..n_shards).map(|_| Mutex::new(ChannelBuffer::new(fnum))).collect(),
            local: Mutex::new(Vec::new()),
            outgoing: (0..fnum).map(|_| Mutex::new(Vec::new())).collect(),
            inbox: Vec::new(),
            mirror_in: (0..fnum).map(|_| None).collect(),
            sent: AtomicUsize::new(0),
            total_sent: 0,
            force: AtomicBool::new(false),
        })
    }

    #[inline]
    pub fn fid(&self) -> PartitionId {
        self.fid
    }

    #[inline]
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    #[inline]
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Reset per-round counters; called by the scheduler before each round.
    pub fn begin_round(&mut self) {
        self.total_sent += std::mem::take(self.sent.get_mut());
        *self.force.get_mut() = false;
    }

    /// Send `msg` to the owner of local vertex `v`. Thread safe.
    ///
    /// `v` is normally an outer vertex; an inner `v` is delivered back to this
    /// partition at the barrier.
    pub fn sync_state_on_outer_vertex<E>(&self, frag: &Fragment<E>, v: LocalId, msg: M) {
        self.push(frag.owner_of(v), frag.gid(v), msg);
    }

    /// Send `msg` to the owner of any global vertex.
    pub fn send_to<E>(&self, frag: &Fragment<E>, gid: VertexId, msg: M) -> Result<(), EngineError> {
        let owner = frag.resolve(gid)?.owner;
        self.push(owner, gid, msg);
        Ok(())
    }

    fn push(&self, owner: PartitionId, gid: VertexId, msg: M) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        if owner == self.fid {
            self.local.lock().push((gid, msg));
            return;
        }
        let shard = rayon::current_thread_index().map_or(0, |t| t + 1) % self.shards.len();
        let full = {
            let mut buf = self.shards[shard].lock();
            let len = buf.push(owner, gid, msg);
            (self.mode == DeliveryMode::Channel && len >= self.flush_threshold)
                .then(|| buf.take(owner))
        };
        if let Some(items) = full {
            self.flush(owner, items);
        }
    }

    fn flush(&self, peer: PartitionId, items: Vec<(VertexId, M)>) {
        let items = batch::combine(items, self.combiner);
        let mut pending = self.outgoing[peer].lock();
        pending.extend(channel::send_updates(&*self.comm, peer, &items));
    }

    /// Broadcast the current value of every mirrored inner vertex to the
    /// peers holding its outer copy.
    pub fn sync_inner_vertices<E>(&self, frag: &Fragment<E>, store: &VertexDataStore<S>) {
        for peer in frag.overlap().neighbours() {
            let mirrors = frag.mirror_vertices_of(peer);
            if mirrors.is_empty() {
                continue;
            }
            let values: Vec<S> = mirrors.iter().map(|&v| store.get(v)).collect();
            let mut pending = self.outgoing[peer].lock();
            pending.extend(channel::send_mirror(&*self.comm, peer, &values));
        }
    }

    /// Write mirror state received at the last barrier into the outer copies.
    pub fn update_outer_vertices<E>(
        &mut self,
        frag: &Fragment<E>,
        store: &mut VertexDataStore<S>,
    ) -> Result<(), EngineError> {
        for peer in 0..self.fnum {
            let Some(values) = self.mirror_in[peer].take() else {
                continue;
            };
            let outer = frag.outer_vertices_of(peer);
            if outer.len() != values.len() {
                return Err(mirror_mismatch(frag, peer));
            }
            for (v, value) in outer.zip(values) {
                store.set_current(v, value);
            }
        }
        Ok(())
    }

    /// `true` if updates arrived at the last barrier.
    pub fn has_updates(&self) -> bool {
        !self.inbox.is_empty()
    }

    /// Resolve and hand out the updates received at the last barrier.
    pub fn take_updates<E>(
        &mut self,
        frag: &Fragment<E>,
    ) -> Result<Vec<(LocalId, M)>, EngineError> {
        let items = batch::combine(std::mem::take(&mut self.inbox), self.combiner);
        items
            .into_iter()
            .map(|(gid, m)| frag.resolve_inner(gid).map(|v| (v, m)))
            .collect()
    }

    /// Apply `f` to every received update in parallel.
    pub fn parallel_process<E, F>(&mut self, frag: &Fragment<E>, f: F) -> Result<(), EngineError>
    where
        F: Fn(LocalId, M) + Send + Sync,
    {
        let updates = self.take_updates(frag)?;
        updates.into_par_iter().for_each(|(v, m)| f(v, m));
        Ok(())
    }

    /// Keep the run going even if no vertex is active after this round.
    pub fn force_continue(&self) {
        self.force.store(true, Ordering::Release);
    }

    #[inline]
    pub fn sent_this_round(&self) -> usize {
        self.sent.load(Ordering::Acquire)
    }

    /// Updates sent over the whole run, including the current round.
    pub fn total_sent(&self) -> usize {
        self.total_sent + self.sent_this_round()
    }

    /// Local termination vote contribution.
    pub fn wants_continue(&self) -> bool {
        self.sent_this_round() > 0 || self.force.load(Ordering::Acquire)
    }

    /// Barrier: send what is left plus `END` to every peer, then receive every
    /// peer's frames up to its `END`.
    pub fn finish_round<E>(&mut self, frag: &Fragment<E>) -> Result<(), EngineError> {
        let peers: Vec<PartitionId> = (0..self.fnum).filter(|&p| p != self.fid).collect();
        for &p in &peers {
            let items = batch::combine(batch::drain_peer(&mut self.shards, p), self.combiner);
            let pending = self.outgoing[p].get_mut();
            if !items.is_empty() {
                pending.extend(channel::send_updates(&*self.comm, p, &items));
            }
            pending.extend(channel::send_end(&*self.comm, p));
        }

        let local = std::mem::take(self.local.get_mut());
        self.inbox.extend(local);

        let mut maybe_err = None;
        for &p in &peers {
            if let Err(e) = self.receive_from(frag, p) {
                maybe_err = Some(e);
                break;
            }
        }

        // always drain send handles
        for &p in &peers {
            for h in self.outgoing[p].get_mut().drain(..) {
                let _ = h.wait();
            }
        }

        log::debug!(
            "fragment {}: barrier done, {} updates out, {} in",
            self.fid,
            self.sent_this_round(),
            self.inbox.len()
        );
        match maybe_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn receive_from<E>(
        &mut self,
        frag: &Fragment<E>,
        peer: PartitionId,
    ) -> Result<(), EngineError> {
        loop {
            match channel::recv_frame::<C, M, S>(&*self.comm, peer)? {
                Frame::Updates(items) => self.inbox.extend(items),
                Frame::Mirror(values) => {
                    if values.len() != frag.outer_vertices_of(peer).len() {
                        return Err(mirror_mismatch(frag, peer));
                    }
                    self.mirror_in[peer] = Some(values);
                }
                Frame::End => return Ok(()),
            }
        }
    }

    pub fn all_gather_u64(&self, value: u64) -> Result<Vec<u64>, EngineError> {
        collective::all_gather_u64(&*self.comm, collective::TAG_COLLECTIVE, value)
    }

    pub fn sum_u64(&self, value: u64) -> Result<u64, EngineError> {
        collective::all_reduce_sum_u64(&*self.comm, value)
    }

    pub fn sum_f64(&self, value: f64) -> Result<f64, EngineError> {
        collective::all_reduce_sum_f64(&*self.comm, value)
    }

    pub fn max_f64(&self, value: f64) -> Result<f64, EngineError> {
        collective::all_reduce_max_f64(&*self.comm, value)
    }

    pub fn any(&self, flag: bool) -> Result<bool, EngineError> {
        collective::all_reduce_any(&*self.comm, flag)
    }
}

fn mirror_mismatch<E>(frag: &Fragment<E>, peer: PartitionId) -> EngineError {
    EngineError::PartitionMismatch {
        vertex: frag
            .outer_vertices_of(peer)
            .next()
            .map(|v| frag.gid(v))
            .unwrap_or_default(),
        expected: peer,
        found: frag.fid(),
    }
}

impl<C, M, S> std::fmt::Debug for MessageManager<C, M, S>
where
    C: Communicator,
    M: Pod + Send + Sync,
    S: AtomicScalar,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageManager")
            .field("fid", &self.fid)
            .field("fnum", &self.fnum)
            .field("mode", &self.mode)
            .field("inbox", &self.inbox.len())
            .finish()
    }
}
