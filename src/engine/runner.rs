//! Entry points: all partitions in one process, or one partition per process.

use super::config::EngineConfig;
use super::program::IncrementalProgram;
use super::report::{RunOutcome, RunReport};
use super::worker::run_worker;
use crate::algs::communicator::{Communicator, RayonComm};
use crate::engine_error::EngineError;
use crate::topology::fragment::Fragment;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate(1)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run every fragment on its own OS thread, connected by an in-process
    /// communicator. `fragments[i]` must be partition `i`.
    pub fn run<P>(
        &self,
        fragments: &[Fragment<P::Edge>],
        program: &P,
    ) -> Result<RunOutcome<P::Value>, EngineError>
    where
        P: IncrementalProgram,
    {
        let n = fragments.len();
        self.config.validate(n)?;
        for (i, f) in fragments.iter().enumerate() {
            if f.fid() != i || f.fnum() != n {
                return Err(EngineError::Configuration(format!(
                    "fragment at position {i} is partition {}/{}, expected {i}/{n}",
                    f.fid(),
                    f.fnum()
                )));
            }
        }
        log::info!("running {n} partitions with {} threads each", self.config.threads);

        let world = RayonComm::world(n);
        let config = &self.config;
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = fragments
                .iter()
                .zip(world)
                .map(|(frag, comm)| {
                    s.spawn(move || run_worker(frag, program, Arc::new(comm), config))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|p| std::panic::resume_unwind(p)))
                .collect()
        });

        let mut parts = Vec::with_capacity(n);
        let mut secondary = None;
        for r in results {
            match r {
                Ok(part) => parts.push(part),
                Err(e) if e.is_secondary() => {
                    secondary.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }
        if let Some(e) = secondary {
            return Err(e);
        }

        let total: usize = fragments.iter().map(Fragment::inner_vertices_num).sum();
        let mut values = Vec::with_capacity(total);
        let mut reports = Vec::with_capacity(n);
        for (vals, report) in parts {
            values.extend(vals);
            reports.push(report);
        }
        values.sort_unstable_by_key(|(g, _)| *g);
        let report = RunReport::merge(reports)
            .ok_or_else(|| EngineError::Configuration("zero partitions".into()))?;
        Ok(RunOutcome { values, report })
    }

    /// Run one partition against `comm`; every rank of the world calls this
    /// with its own fragment. Values and message count cover this partition
    /// only.
    pub fn run_partition<P, C>(
        &self,
        fragment: &Fragment<P::Edge>,
        program: &P,
        comm: C,
    ) -> Result<RunOutcome<P::Value>, EngineError>
    where
        P: IncrementalProgram,
        C: Communicator,
    {
        self.config.validate(fragment.fnum())?;
        let (values, report) = run_worker(fragment, program, Arc::new(comm), &self.config)?;
        Ok(RunOutcome { values, report })
    }
}
