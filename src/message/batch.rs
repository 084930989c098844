//! Barrier-time packing of buffered updates.

use super::channel::ChannelBuffer;
use crate::overlap::Combiner;
use crate::topology::vertex::{PartitionId, VertexId};
use itertools::Itertools;
use parking_lot::Mutex;

/// Fold updates with equal destinations. Output is sorted by destination;
/// without a combiner the input order is kept.
pub(crate) fn combine<M>(
    mut items: Vec<(VertexId, M)>,
    combiner: Option<Combiner<M>>,
) -> Vec<(VertexId, M)> {
    let Some(merge) = combiner else {
        return items;
    };
    if items.len() < 2 {
        return items;
    }
    // stable, so equal ids fold in push order
    items.sort_by_key(|(gid, _)| *gid);
    items
        .into_iter()
        .coalesce(|(a, mut ma), (b, mb)| {
            if a == b {
                merge(&mut ma, mb);
                Ok((a, ma))
            } else {
                Err(((a, ma), (b, mb)))
            }
        })
        .collect()
}

/// Drain `peer`'s list out of every thread shard.
pub(crate) fn drain_peer<M>(
    shards: &mut [Mutex<ChannelBuffer<M>>],
    peer: PartitionId,
) -> Vec<(VertexId, M)> {
    let mut out = Vec::new();
    for s in shards {
        out.append(&mut s.get_mut().take(peer));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::{AddDelta, MinDelta, combiner_of};

    fn ids(v: &[(VertexId, f64)]) -> Vec<u64> {
        v.iter().map(|(g, _)| g.get()).collect()
    }

    #[test]
    fn min_combiner_keeps_one_message_per_destination() {
        let raw = vec![
            (VertexId::new(3), 5.0),
            (VertexId::new(1), 2.0),
            (VertexId::new(3), 4.0),
            (VertexId::new(3), 4.0),
        ];
        let out = combine(raw, Some(combiner_of::<MinDelta, f64>()));
        assert_eq!(out, vec![(VertexId::new(1), 2.0), (VertexId::new(3), 4.0)]);
    }

    #[test]
    fn add_combiner_sums() {
        let raw = vec![(VertexId::new(0), 0.25), (VertexId::new(0), 0.5)];
        let out = combine(raw, Some(combiner_of::<AddDelta, f64>()));
        assert_eq!(out, vec![(VertexId::new(0), 0.75)]);
    }

    #[test]
    fn no_combiner_passes_through() {
        let raw = vec![(VertexId::new(2), 1.0), (VertexId::new(2), 1.0)];
        assert_eq!(ids(&combine(raw, None)), vec![2, 2]);
    }

    #[test]
    fn drain_collects_from_all_shards() {
        let mut shards: Vec<_> = (0..3).map(|_| Mutex::new(ChannelBuffer::new(2))).collect();
        shards[0].lock().push(1, VertexId::new(7), 1.0);
        shards[2].lock().push(1, VertexId::new(8), 2.0);
        shards[2].lock().push(0, VertexId::new(9), 3.0);
        assert_eq!(ids(&drain_peer(&mut shards, 1)), vec![7, 8]);
        assert!(drain_peer(&mut shards, 1).is_empty());
        assert_eq!(ids(&drain_peer(&mut shards, 0)), vec![9]);
    }
}
