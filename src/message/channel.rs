//! Frame transport between two partitions.
//!
//! Every frame travels on [`TAG_FRAMES`] as a header message followed by at
//! most one body message. A peer's traffic for one round is the sequence of
//! its frames up to and including `END`; the per-tag FIFO guarantee of the
//! communicator keeps that sequence intact.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{
    KIND_END, KIND_MIRROR, KIND_UPDATES, WireFrameHdr, body_len_mirror, body_len_updates,
    cast_slice, decode_payloads, decode_updates, encode_payloads, encode_updates,
};
use crate::engine_error::EngineError;
use crate::topology::vertex::{PartitionId, VertexId};
use bytemuck::Pod;
use std::mem::size_of;

/// Tag carrying update, mirror and end frames.
pub const TAG_FRAMES: CommTag = CommTag::new(0x4D00);

/// Per-thread outgoing updates, one list per destination partition.
#[derive(Debug)]
pub(crate) struct ChannelBuffer<M> {
    per_peer: Vec<Vec<(VertexId, M)>>,
}

impl<M> ChannelBuffer<M> {
    pub(crate) fn new(n_peers: usize) -> Self {
        Self {
            per_peer: (0..n_peers).map(|_| Vec::new()).collect(),
        }
    }

    /// Append and return the new length of `peer`'s list.
    #[inline]
    pub(crate) fn push(&mut self, peer: PartitionId, gid: VertexId, msg: M) -> usize {
        let list = &mut self.per_peer[peer];
        list.push((gid, msg));
        list.len()
    }

    pub(crate) fn take(&mut self, peer: PartitionId) -> Vec<(VertexId, M)> {
        std::mem::take(&mut self.per_peer[peer])
    }
}

/// A frame as seen by the receiver.
#[derive(Debug, PartialEq)]
pub(crate) enum Frame<M, S> {
    Updates(Vec<(VertexId, M)>),
    Mirror(Vec<S>),
    End,
}

fn post<C: Communicator + ?Sized>(
    comm: &C,
    peer: PartitionId,
    hdr: WireFrameHdr,
    body: Option<Vec<u8>>,
) -> Vec<C::SendHandle> {
    let mut handles = Vec::with_capacity(2);
    handles.push(comm.isend(peer, TAG_FRAMES.as_u16(), cast_slice(std::slice::from_ref(&hdr))));
    if let Some(body) = body {
        handles.push(comm.isend(peer, TAG_FRAMES.as_u16(), &body));
    }
    handles
}

/// Post an `UPDATES` frame; the caller keeps header and body adjacent.
pub(crate) fn send_updates<C, M>(
    comm: &C,
    peer: PartitionId,
    items: &[(VertexId, M)],
) -> Vec<C::SendHandle>
where
    C: Communicator + ?Sized,
    M: Pod,
{
    let hdr = WireFrameHdr::new(KIND_UPDATES, items.len());
    let body = (!items.is_empty()).then(|| encode_updates(items));
    post(comm, peer, hdr, body)
}

pub(crate) fn send_mirror<C, S>(comm: &C, peer: PartitionId, values: &[S]) -> Vec<C::SendHandle>
where
    C: Communicator + ?Sized,
    S: Pod,
{
    let hdr = WireFrameHdr::new(KIND_MIRROR, values.len());
    let body = (body_len_mirror::<S>(values.len()) > 0).then(|| encode_payloads(values));
    post(comm, peer, hdr, body)
}

pub(crate) fn send_end<C>(comm: &C, peer: PartitionId) -> Vec<C::SendHandle>
where
    C: Communicator + ?Sized,
{
    post(comm, peer, WireFrameHdr::new(KIND_END, 0), None)
}

fn comm_err(peer: PartitionId, reason: impl Into<String>) -> EngineError {
    EngineError::CommError {
        neighbor: peer,
        reason: reason.into(),
    }
}

/// Block until the next frame from `peer` arrives.
pub(crate) fn recv_frame<C, M, S>(comm: &C, peer: PartitionId) -> Result<Frame<M, S>, EngineError>
where
    C: Communicator + ?Sized,
    M: Pod,
    S: Pod,
{
    let mut hdr_buf = [0u8; size_of::<WireFrameHdr>()];
    let raw = comm
        .irecv(peer, TAG_FRAMES.as_u16(), &mut hdr_buf)
        .wait()
        .ok_or_else(|| comm_err(peer, "peer went away"))?;
    let hdr = WireFrameHdr::decode(&raw).map_err(|e| comm_err(peer, format!("frame header: {e}")))?;
    let count = hdr.count();

    let body = |len: usize| -> Result<Vec<u8>, EngineError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; len];
        comm.irecv(peer, TAG_FRAMES.as_u16(), &mut buf)
            .wait()
            .ok_or_else(|| comm_err(peer, "peer went away mid-frame"))
    };

    match hdr.kind() {
        KIND_UPDATES => {
            let bytes = body(body_len_updates::<M>(count))?;
            decode_updates(&bytes, count)
                .map(Frame::Updates)
                .map_err(|e| comm_err(peer, format!("updates body: {e}")))
        }
        KIND_MIRROR => {
            let len = body_len_mirror::<S>(count);
            let bytes = body(len)?;
            if bytes.len() != len {
                return Err(comm_err(
                    peer,
                    format!("mirror body: expected {len} bytes, got {}", bytes.len()),
                ));
            }
            Ok(Frame::Mirror(decode_payloads(&bytes, count)))
        }
        KIND_END => Ok(Frame::End),
        other => Err(comm_err(peer, format!("unknown frame kind {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::RayonComm;

    #[test]
    fn frames_arrive_in_order_until_end() {
        let world = RayonComm::world(2);
        let items = vec![(VertexId::new(4), 2.5_f64), (VertexId::new(9), 1.0)];
        send_updates(&world[0], 1, &items);
        send_mirror(&world[0], 1, &[7u32, 8]);
        send_updates::<_, f64>(&world[0], 1, &[]);
        send_end(&world[0], 1);

        let mut got = Vec::new();
        loop {
            let f: Frame<f64, u32> = recv_frame(&world[1], 0).unwrap();
            let end = f == Frame::End;
            got.push(f);
            if end {
                break;
            }
        }
        assert_eq!(
            got,
            vec![
                Frame::Updates(items),
                Frame::Mirror(vec![7, 8]),
                Frame::Updates(vec![]),
                Frame::End
            ]
        );
    }

    #[test]
    fn garbage_header_is_a_comm_error() {
        let world = RayonComm::world(2);
        world[0].isend(1, TAG_FRAMES.as_u16(), &[1, 2, 3]);
        let err = recv_frame::<_, f64, f64>(&world[1], 0).unwrap_err();
        assert!(matches!(err, EngineError::CommError { neighbor: 0, .. }));
    }

    #[test]
    fn buffers_track_lengths_per_peer() {
        let mut b = ChannelBuffer::new(3);
        assert_eq!(b.push(2, VertexId::new(1), 0u32), 1);
        assert_eq!(b.push(2, VertexId::new(5), 1u32), 2);
        assert_eq!(b.push(0, VertexId::new(5), 1u32), 1);
        assert_eq!(b.take(2).len(), 2);
        assert!(b.take(2).is_empty());
    }
}
