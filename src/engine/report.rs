//! What a run produced besides vertex values.

use crate::engine_error::EngineError;
use crate::topology::vertex::VertexId;
use serde::Serialize;

/// Why the round loop stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// No partition had active vertices, sent updates or asked to continue.
    Quiescent,
    /// The configured bound was reached while work remained.
    RoundBudgetExhausted { bound: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Incremental rounds executed after PEval.
    pub inc_rounds: usize,
    pub termination: Termination,
    /// Updates sent by all partitions, local deliveries included.
    pub messages_sent: usize,
}

impl RunReport {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Quiescent
    }

    /// `NonConvergence` when the round bound stopped the run.
    pub fn warning(&self) -> Option<EngineError> {
        match self.termination {
            Termination::Quiescent => None,
            Termination::RoundBudgetExhausted { bound } => {
                Some(EngineError::NonConvergence { bound })
            }
        }
    }

    /// Combine per-partition reports of one run.
    pub(crate) fn merge(reports: impl IntoIterator<Item = RunReport>) -> Option<RunReport> {
        reports.into_iter().reduce(|a, b| RunReport {
            inc_rounds: a.inc_rounds.max(b.inc_rounds),
            termination: if a.converged() { b.termination } else { a.termination },
            messages_sent: a.messages_sent + b.messages_sent,
        })
    }
}

/// Final inner values of every partition, sorted by global id.
#[derive(Clone, Debug)]
pub struct RunOutcome<V> {
    pub values: Vec<(VertexId, V)>,
    pub report: RunReport,
}

impl<V: Copy> RunOutcome<V> {
    pub fn get(&self, gid: VertexId) -> Option<V> {
        self.values
            .binary_search_by_key(&gid, |(g, _)| *g)
            .ok()
            .map(|i| self.values[i].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exhaustion_is_a_warning() {
        let r = RunReport {
            inc_rounds: 3,
            termination: Termination::RoundBudgetExhausted { bound: 3 },
            messages_sent: 0,
        };
        assert!(!r.converged());
        assert_eq!(r.warning(), Some(EngineError::NonConvergence { bound: 3 }));
    }

    #[test]
    fn merge_sums_messages() {
        let a = RunReport {
            inc_rounds: 2,
            termination: Termination::Quiescent,
            messages_sent: 4,
        };
        let b = RunReport {
            messages_sent: 6,
            ..a.clone()
        };
        let m = RunReport::merge([a, b]).unwrap();
        assert_eq!(m.messages_sent, 10);
        assert!(m.warning().is_none());
    }

    #[test]
    fn lookup_by_gid() {
        let o = RunOutcome {
            values: vec![(VertexId::new(1), 0.5), (VertexId::new(4), 2.0)],
            report: RunReport {
                inc_rounds: 0,
                termination: Termination::Quiescent,
                messages_sent: 0,
            },
        };
        assert_eq!(o.get(VertexId::new(4)), Some(2.0));
        assert_eq!(o.get(VertexId::new(2)), None);
    }
}
