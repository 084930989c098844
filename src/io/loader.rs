//! Edge-list readers and a synthetic power-law generator.
//!
//! # Supported formats
//! - `tsv` / `snap`: one edge per line, `src dst [weight]`, separated by tabs
//!   or spaces. Lines starting with `#` and blank lines are skipped. Missing
//!   weights default to 1.
//! - `adj`: one vertex per line, `src n d1 ... dn`. A vertex with `n = 0` is
//!   still added to the graph. All edges have weight 1.

use crate::engine_error::EngineError;
use crate::topology::edge_list::EdgeList;
use crate::topology::vertex::VertexId;
use hashbrown::HashSet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Readers that turn a text stream into a weighted edge list.
pub trait EdgeListReader {
    fn read<R: Read>(&self, reader: R) -> Result<EdgeList<f64>, EngineError>;
}

/// Reader for `src dst [weight]` lines (`tsv` and `snap`).
#[derive(Debug, Clone)]
pub struct TsvReader {
    pub directed: bool,
}

impl Default for TsvReader {
    fn default() -> Self {
        Self { directed: true }
    }
}

/// Reader for `src n d1 ... dn` adjacency lines.
#[derive(Debug, Clone)]
pub struct AdjReader {
    pub directed: bool,
}

impl Default for AdjReader {
    fn default() -> Self {
        Self { directed: true }
    }
}

fn parse_id(raw: &str, line: usize) -> Result<VertexId, EngineError> {
    raw.parse::<u64>().map(VertexId::new).map_err(|_| EngineError::Parse {
        line,
        reason: format!("invalid vertex id `{raw}`"),
    })
}

fn missing(what: &str, line: usize) -> EngineError {
    EngineError::Parse {
        line,
        reason: format!("missing {what}"),
    }
}

/// Yield `(line number, trimmed content)` of every non-comment line.
fn content_lines<R: Read>(reader: R) -> impl Iterator<Item = Result<(usize, String), EngineError>> {
    BufReader::new(reader)
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Err(e) => Some(Err(EngineError::Io {
                path: "<stream>".into(),
                reason: e.to_string(),
            })),
            Ok(l) => {
                let t = l.trim();
                (!t.is_empty() && !t.starts_with('#')).then(|| Ok((i + 1, t.to_owned())))
            }
        })
}

impl EdgeListReader for TsvReader {
    fn read<R: Read>(&self, reader: R) -> Result<EdgeList<f64>, EngineError> {
        let mut g = EdgeList::new(self.directed);
        for item in content_lines(reader) {
            let (n, line) = item?;
            let mut parts = line.split_whitespace();
            let src = parse_id(parts.next().ok_or_else(|| missing("source", n))?, n)?;
            let dst = parse_id(parts.next().ok_or_else(|| missing("target", n))?, n)?;
            let w = match parts.next() {
                Some(raw) => raw.parse::<f64>().map_err(|_| EngineError::Parse {
                    line: n,
                    reason: format!("invalid weight `{raw}`"),
                })?,
                None => 1.0,
            };
            g.add_edge(src, dst, w);
        }
        Ok(g)
    }
}

impl EdgeListReader for AdjReader {
    fn read<R: Read>(&self, reader: R) -> Result<EdgeList<f64>, EngineError> {
        let mut g = EdgeList::new(self.directed);
        for item in content_lines(reader) {
            let (n, line) = item?;
            let mut parts = line.split_whitespace();
            let src = parse_id(parts.next().ok_or_else(|| missing("source", n))?, n)?;
            let raw = parts.next().ok_or_else(|| missing("neighbour count", n))?;
            let count = raw.parse::<usize>().map_err(|_| EngineError::Parse {
                line: n,
                reason: format!("invalid neighbour count `{raw}`"),
            })?;
            g.add_vertex(src);
            let mut seen = 0;
            for raw in parts {
                g.add_edge(src, parse_id(raw, n)?, 1.0);
                seen += 1;
            }
            if seen != count {
                return Err(EngineError::Parse {
                    line: n,
                    reason: format!("expected {count} neighbours, found {seen}"),
                });
            }
        }
        Ok(g)
    }
}

/// Parse `reader` in the named format.
pub fn read_edge_list<R: Read>(
    reader: R,
    format: &str,
    directed: bool,
) -> Result<EdgeList<f64>, EngineError> {
    match format {
        "tsv" | "snap" => TsvReader { directed }.read(reader),
        "adj" => AdjReader { directed }.read(reader),
        other => Err(EngineError::Configuration(format!(
            "unknown graph format `{other}` (expected tsv, snap or adj)"
        ))),
    }
}

/// Load a directed graph from `path` in the named format.
pub fn load_format(path: impl AsRef<Path>, format: &str) -> Result<EdgeList<f64>, EngineError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| EngineError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let g = read_edge_list(file, format, true).map_err(|e| match e {
        EngineError::Io { reason, .. } => EngineError::Io {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })?;
    log::info!(
        "loaded {} ({format}): {} edges",
        path.display(),
        g.edge_count()
    );
    Ok(g)
}

/// Graph on vertices `0..n` whose out-degrees follow a Zipf law with
/// exponent `alpha`, capped at `edge_bound` and at `n - 1`. Targets are
/// distinct, uniform and never the source itself.
pub fn synthetic_powerlaw(
    n: u64,
    directed: bool,
    alpha: f64,
    edge_bound: u64,
    seed: u64,
) -> Result<EdgeList<f64>, EngineError> {
    if !(alpha > 0.0) {
        return Err(EngineError::Configuration(format!(
            "power-law exponent must be positive, got {alpha}"
        )));
    }
    let mut g = EdgeList::new(directed);
    for v in 0..n {
        g.add_vertex(VertexId::new(v));
    }
    let max_degree = edge_bound.min(n.saturating_sub(1));
    if max_degree == 0 {
        return Ok(g);
    }

    // cumulative Zipf weights over degrees 1..=max_degree
    let mut cdf = Vec::with_capacity(max_degree as usize);
    let mut acc = 0.0;
    for d in 1..=max_degree {
        acc += (d as f64).powf(-alpha);
        cdf.push(acc);
    }

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut targets = HashSet::new();
    for src in 0..n {
        let u = rng.r#gen::<f64>() * acc;
        let degree = cdf.partition_point(|&c| c < u) as u64 + 1;
        targets.clear();
        while (targets.len() as u64) < degree.min(max_degree) {
            let t = rng.gen_range(0..n);
            if t != src && targets.insert(t) {
                g.add_edge(VertexId::new(src), VertexId::new(t), 1.0);
            }
        }
    }
    log::debug!("synthetic power-law graph: {n} vertices, {} edges", g.edge_count());
    Ok(g)
}
