//! Small collectives built on point-to-point `isend`/`irecv`.
//!
//! Every rank posts its receives, then its sends, waits on all receives and
//! always drains its sends before returning, even when a receive failed.
//! Reductions gather every rank's contribution and fold them in rank order,
//! so all ranks compute bit-identical results.
//!
//! All ranks must call the same collectives in the same order with the same
//! tag; messages of one `(source, destination, tag)` stay in FIFO order, so
//! consecutive calls cannot mix.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireU64, cast_slice};
use crate::engine_error::EngineError;
use std::mem::size_of;

/// Tag reserved for collectives.
pub const TAG_COLLECTIVE: CommTag = CommTag::new(0x4C00);

/// Every rank's `value`, indexed by rank.
pub fn all_gather_u64<C>(comm: &C, tag: CommTag, value: u64) -> Result<Vec<u64>, EngineError>
where
    C: Communicator + ?Sized,
{
    let size = comm.size();
    let me = comm.rank();
    let mut out = vec![0u64; size];
    out[me] = value;
    if size == 1 {
        return Ok(out);
    }

    // 1) post all receives
    let mut recvs = Vec::with_capacity(size - 1);
    for peer in (0..size).filter(|&p| p != me) {
        let mut buf = [0u8; size_of::<WireU64>()];
        recvs.push((peer, comm.irecv(peer, tag.as_u16(), &mut buf)));
    }

    // 2) post all sends
    let wire = WireU64::of(value);
    let sends: Vec<_> = (0..size)
        .filter(|&p| p != me)
        .map(|peer| comm.isend(peer, tag.as_u16(), cast_slice(std::slice::from_ref(&wire))))
        .collect();

    // 3) wait for all receives, keep the first error
    let mut maybe_err = None;
    for (peer, h) in recvs {
        match h.wait() {
            Some(data) if data.len() == size_of::<WireU64>() => {
                let w: WireU64 = bytemuck::pod_read_unaligned(&data);
                out[peer] = w.get();
            }
            Some(data) if maybe_err.is_none() => {
                maybe_err = Some(EngineError::CommError {
                    neighbor: peer,
                    reason: format!("collective: expected 8 bytes, got {}", data.len()),
                });
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(EngineError::CommError {
                    neighbor: peer,
                    reason: "collective: peer went away".into(),
                });
            }
            _ => {} // already have an error; just drain
        }
    }

    // 4) always drain all send handles
    for s in sends {
        let _ = s.wait();
    }

    match maybe_err {
        Some(e) => Err(e),
        None => Ok(out),
    }
}

pub fn all_reduce_sum_u64<C>(comm: &C, value: u64) -> Result<u64, EngineError>
where
    C: Communicator + ?Sized,
{
    Ok(all_gather_u64(comm, TAG_COLLECTIVE, value)?.into_iter().sum())
}

pub fn all_reduce_sum_f64<C>(comm: &C, value: f64) -> Result<f64, EngineError>
where
    C: Communicator + ?Sized,
{
    Ok(all_gather_u64(comm, TAG_COLLECTIVE, value.to_bits())?
        .into_iter()
        .map(f64::from_bits)
        .sum())
}

pub fn all_reduce_max_f64<C>(comm: &C, value: f64) -> Result<f64, EngineError>
where
    C: Communicator + ?Sized,
{
    Ok(all_gather_u64(comm, TAG_COLLECTIVE, value.to_bits())?
        .into_iter()
        .map(f64::from_bits)
        .fold(f64::NEG_INFINITY, f64::max))
}

/// Logical OR across ranks.
pub fn all_reduce_any<C>(comm: &C, flag: bool) -> Result<bool, EngineError>
where
    C: Communicator + ?Sized,
{
    Ok(all_gather_u64(comm, TAG_COLLECTIVE, u64::from(flag))?
        .into_iter()
        .any(|x| x != 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, RayonComm};

    fn on_world<T: Send>(n: usize, f: impl Fn(&RayonComm) -> T + Sync) -> Vec<T> {
        let world = RayonComm::world(n);
        std::thread::scope(|s| {
            let hs: Vec<_> = world.iter().map(|c| s.spawn(|| f(c))).collect();
            hs.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn gather_and_reduce_agree_on_every_rank() {
        let res = on_world(4, |c| {
            let r = c.rank() as u64;
            (
                all_gather_u64(c, TAG_COLLECTIVE, r * 10).unwrap(),
                all_reduce_sum_u64(c, r).unwrap(),
                all_reduce_max_f64(c, r as f64 * 0.5).unwrap(),
                all_reduce_any(c, r == 2).unwrap(),
                all_reduce_any(c, false).unwrap(),
            )
        });
        for (g, s, m, any, none) in res {
            assert_eq!(g, vec![0, 10, 20, 30]);
            assert_eq!(s, 6);
            assert_eq!(m, 1.5);
            assert!(any);
            assert!(!none);
        }
    }

    #[test]
    fn float_sums_are_bit_identical() {
        let res = on_world(3, |c| all_reduce_sum_f64(c, 0.1 * (c.rank() + 1) as f64).unwrap());
        assert!(res.windows(2).all(|w| w[0].to_bits() == w[1].to_bits()));
    }

    #[test]
    fn single_rank_is_local() {
        assert_eq!(all_reduce_sum_f64(&NoComm, 2.5).unwrap(), 2.5);
        assert_eq!(all_gather_u64(&NoComm, TAG_COLLECTIVE, 7).unwrap(), vec![7]);
    }

    #[test]
    fn aborted_peer_surfaces_as_comm_error() {
        let world = RayonComm::world(2);
        world[1].abort();
        let err = all_reduce_any(&world[0], true).unwrap_err();
        assert!(matches!(err, EngineError::CommError { neighbor: 1, .. }));
    }
}
