//! The round loop of one partition.

use super::config::EngineConfig;
use super::program::{IncrementalProgram, Round};
use super::report::{RunReport, Termination};
use crate::algs::communicator::Communicator;
use crate::data::VertexDataStore;
use crate::engine_error::EngineError;
use crate::frontier::Frontier;
use crate::message::MessageManager;
use crate::topology::fragment::Fragment;
use crate::topology::vertex::VertexId;
use std::sync::Arc;

/// Aborts the communicator unless disarmed, so peers never wait on a
/// partition that failed or panicked.
struct AbortGuard<'a, C: Communicator> {
    comm: &'a C,
    armed: bool,
}

impl<C: Communicator> Drop for AbortGuard<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            self.comm.abort();
        }
    }
}

pub(crate) type WorkerOutput<V> = (Vec<(VertexId, V)>, RunReport);

/// Run `program` on `frag` inside a dedicated thread pool.
pub(crate) fn run_worker<C, P>(
    frag: &Fragment<P::Edge>,
    program: &P,
    comm: Arc<C>,
    config: &EngineConfig,
) -> Result<WorkerOutput<P::Value>, EngineError>
where
    C: Communicator,
    P: IncrementalProgram,
{
    let mut guard = AbortGuard {
        comm: &*comm,
        armed: true,
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(move |i| format!("fragment-worker-{i}"))
        .build()
        .map_err(|e| EngineError::Configuration(format!("thread pool: {e}")))?;
    let out = pool.install(|| drive(frag, program, Arc::clone(&comm), config));
    match &out {
        Ok(_) => guard.armed = false,
        Err(e) if !e.is_secondary() => {
            log::error!("fragment {}: {e}", frag.fid());
        }
        Err(_) => {}
    }
    out
}

fn drive<C, P>(
    frag: &Fragment<P::Edge>,
    program: &P,
    comm: Arc<C>,
    config: &EngineConfig,
) -> Result<WorkerOutput<P::Value>, EngineError>
where
    C: Communicator,
    P: IncrementalProgram,
{
    program.validate(config)?;
    let mode = config.mode.unwrap_or_else(|| program.delivery_mode());
    let mut values = VertexDataStore::new(
        program.buffering(),
        frag.vertices_num(),
        program.initial_value(),
    );
    let mut frontier = Frontier::new(frag.vertices_num());
    let mut messages: MessageManager<C, P::Message, P::Value> = MessageManager::new(
        comm,
        frag.fid(),
        frag.fnum(),
        mode,
        config.channel_flush_threshold,
        program.combiner(),
    )?;
    log::info!(
        "fragment {}/{}: {} inner, {} outer, {} edges, {:?}",
        frag.fid(),
        frag.fnum(),
        frag.inner_vertices_num(),
        frag.outer_vertices_num(),
        frag.edge_num(),
        mode
    );

    // Init
    let mut ctx = program.init(
        frag,
        &mut Round::new(0, &mut values, &frontier, &mut messages, config),
    )?;

    // PEval
    messages.begin_round();
    program.peval(
        frag,
        &mut ctx,
        &mut Round::new(0, &mut values, &frontier, &mut messages, config),
    )?;

    let mut inc_rounds = 0;
    let termination = loop {
        // Barrier
        messages.finish_round(frag)?;
        frontier.swap();
        let active = !frontier.current().is_empty_over(frag.inner_vertices());
        let vote = active || messages.wants_continue();
        if !messages.any(vote)? {
            break Termination::Quiescent;
        }
        if let Some(bound) = config.max_rounds {
            if inc_rounds >= bound {
                log::warn!(
                    "fragment {}: round bound {bound} reached with work remaining",
                    frag.fid()
                );
                break Termination::RoundBudgetExhausted { bound };
            }
        }

        // IncEval
        inc_rounds += 1;
        messages.begin_round();
        log::debug!(
            "fragment {}: round {inc_rounds}, {} active",
            frag.fid(),
            frontier.current().len()
        );
        program.inc_eval(
            frag,
            &mut ctx,
            &mut Round::new(inc_rounds, &mut values, &frontier, &mut messages, config),
        )?;
    };

    // Terminated
    program.finalize(
        frag,
        &mut ctx,
        &mut Round::new(inc_rounds, &mut values, &frontier, &mut messages, config),
    )?;
    log::info!(
        "fragment {}: {:?} after {inc_rounds} incremental rounds",
        frag.fid(),
        termination
    );

    let out = frag
        .inner_vertices()
        .map(|v| (frag.gid(v), values.get(v)))
        .collect();
    Ok((
        out,
        RunReport {
            inc_rounds,
            termination,
            messages_sent: messages.total_sent(),
        },
    ))
}
