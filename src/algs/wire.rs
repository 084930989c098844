//! Fixed, versioned wire records for the message manager and collectives.
//!
//! A *frame* is a [`WireFrameHdr`] message optionally followed by one body
//! message:
//! - `UPDATES`: `count` little-endian `u64` vertex ids, then `count` payloads,
//! - `MIRROR`: `count` payloads aligned with the receiver's outer list,
//! - `END`: no body; closes the sender's traffic for the current round.
//!
//! Header and id fields are little-endian. Payloads are the native bytes of
//! a `Pod` type; all ranks of a run share one architecture.

use crate::topology::vertex::VertexId;
use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

pub const KIND_UPDATES: u16 = 1;
pub const KIND_MIRROR: u16 = 2;
pub const KIND_END: u16 = 3;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireFrameHdr {
    pub version_le: u16, // = WIRE_VERSION.to_le()
    pub kind_le: u16,
    pub count_le: u32, // records in the body
}

impl WireFrameHdr {
    pub fn new(kind: u16, count: usize) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
            count_le: (count as u32).to_le(),
        }
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
    pub fn count(&self) -> usize {
        u32::from_le(self.count_le) as usize
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        expect_exact_len(bytes.len(), size_of::<Self>())?;
        let hdr: Self = bytemuck::pod_read_unaligned(bytes);
        if hdr.version() != WIRE_VERSION {
            return Err(format!(
                "wire version {} (expected {WIRE_VERSION})",
                hdr.version()
            ));
        }
        Ok(hdr)
    }
}

/// A single `u64` scalar for collectives.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireU64(pub u64);

impl WireU64 {
    pub fn of(v: u64) -> Self {
        Self(v.to_le())
    }
    pub fn get(&self) -> u64 {
        u64::from_le(self.0)
    }
}

/// Bytes of an `UPDATES` body.
pub fn body_len_updates<M: Pod>(count: usize) -> usize {
    count * (size_of::<u64>() + size_of::<M>())
}

/// Bytes of a `MIRROR` body.
pub fn body_len_mirror<M: Pod>(count: usize) -> usize {
    count * size_of::<M>()
}

/// Encode `(id, payload)` pairs as ids block followed by payload block.
pub fn encode_updates<M: Pod>(items: &[(VertexId, M)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body_len_updates::<M>(items.len()));
    for (id, _) in items {
        out.extend_from_slice(&id.get().to_le_bytes());
    }
    if size_of::<M>() > 0 {
        for (_, m) in items {
            out.extend_from_slice(bytemuck::bytes_of(m));
        }
    }
    out
}

pub fn decode_updates<M: Pod>(bytes: &[u8], count: usize) -> Result<Vec<(VertexId, M)>, String> {
    expect_exact_len(bytes.len(), body_len_updates::<M>(count))?;
    let (ids, payloads) = bytes.split_at(count * size_of::<u64>());
    let ids = ids.chunks_exact(size_of::<u64>()).map(|c| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(c);
        VertexId::new(u64::from_le_bytes(raw))
    });
    Ok(ids.zip(decode_payloads::<M>(payloads, count)).collect())
}

pub fn encode_payloads<M: Pod>(items: &[M]) -> Vec<u8> {
    if size_of::<M>() == 0 {
        return Vec::new();
    }
    cast_slice(items).to_vec()
}

/// Payloads may be unaligned inside the body, so read them one by one.
pub fn decode_payloads<M: Pod>(bytes: &[u8], count: usize) -> Vec<M> {
    if size_of::<M>() == 0 {
        return vec![M::zeroed(); count];
    }
    bytes
        .chunks_exact(size_of::<M>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

const _: () = {
    assert!(size_of::<WireFrameHdr>() == 8);
    assert!(size_of::<WireU64>() == 8);
};
