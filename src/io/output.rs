//! Result sink: `"<id> <value>"` lines, one per owned vertex.
//!
//! Non-finite values (unreached vertices of a shortest-path run) are written
//! as the sentinel `infinity`.

use crate::data::{AtomicScalar, VertexDataStore};
use crate::engine_error::EngineError;
use crate::topology::fragment::Fragment;
use crate::topology::vertex::VertexId;
use std::io::{self, Write};

pub const INFINITY_SENTINEL: &str = "infinity";

/// Values that can be written by [`write_results`].
pub trait OutputValue {
    fn write_value<W: Write>(&self, w: &mut W) -> io::Result<()>;
}

macro_rules! impl_output_float {
    ($($t:ty),*) => {$(
        impl OutputValue for $t {
            fn write_value<W: Write>(&self, w: &mut W) -> io::Result<()> {
                if self.is_finite() {
                    write!(w, "{self}")
                } else {
                    w.write_all(INFINITY_SENTINEL.as_bytes())
                }
            }
        }
    )*};
}

macro_rules! impl_output_int {
    ($($t:ty),*) => {$(
        impl OutputValue for $t {
            fn write_value<W: Write>(&self, w: &mut W) -> io::Result<()> {
                write!(w, "{self}")
            }
        }
    )*};
}

impl_output_float!(f32, f64);
impl_output_int!(u32, u64, i32, i64);

/// Visit every inner vertex of `frag` with its global id and current value.
pub fn for_each_inner_vertex<E, T, F>(frag: &Fragment<E>, store: &VertexDataStore<T>, mut f: F)
where
    T: AtomicScalar,
    F: FnMut(VertexId, T),
{
    for v in frag.inner_vertices() {
        f(frag.gid(v), store.get(v));
    }
}

/// Write one `"<id> <value>"` line per entry, in the given order.
pub fn write_results<W, V>(mut writer: W, values: &[(VertexId, V)]) -> Result<(), EngineError>
where
    W: Write,
    V: OutputValue,
{
    let io_err = |e: io::Error| EngineError::Io {
        path: "<results>".into(),
        reason: e.to_string(),
    };
    for (id, value) in values {
        write!(writer, "{id} ").map_err(io_err)?;
        value.write_value(&mut writer).map_err(io_err)?;
        writer.write_all(b"\n").map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}

/// Write the owned vertices of one partition straight from its store.
pub fn write_partition<W, E, T>(
    writer: W,
    frag: &Fragment<E>,
    store: &VertexDataStore<T>,
) -> Result<(), EngineError>
where
    W: Write,
    T: AtomicScalar + OutputValue,
{
    let mut values = Vec::with_capacity(frag.inner_vertices_num());
    for_each_inner_vertex(frag, store, |g, x| values.push((g, x)));
    write_results(writer, &values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Buffering;
    use crate::topology::builder::FragmentBuilder;
    use crate::topology::edge_list::EdgeList;

    #[test]
    fn infinite_values_use_the_sentinel() {
        let mut out = Vec::new();
        let values = [
            (VertexId::new(0), 0.0),
            (VertexId::new(1), 2.5),
            (VertexId::new(2), f64::INFINITY),
        ];
        write_results(&mut out, &values).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 0\n1 2.5\n2 infinity\n");
    }

    #[test]
    fn partition_writes_only_owned_vertices() {
        let g = EdgeList::from_edges(true, [(0, 1, ()), (1, 2, ())]);
        let frags = FragmentBuilder::new(&g, 2).build().unwrap();
        let f = &frags[0];
        let mut store = VertexDataStore::new(Buffering::InPlace, f.vertices_num(), 7u64);
        let first = f.inner_vertices().next().unwrap();
        store.set(first, 1);
        let mut out = Vec::new();
        write_partition(&mut out, f, &store).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), f.inner_vertices_num());
        assert!(text.starts_with(&format!("{} 1\n", f.gid(first))));
    }
}
