mod util;

use fragment_engine::prelude::*;
use util::*;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Phase {
    Init,
    PEval,
    IncEval(usize),
    Finalize,
}

/// Keeps every partition busy until `victim` fails in `phase` by addressing
/// a vertex nobody owns.
struct FailAt {
    victim: usize,
    phase: Phase,
    panic: bool,
}

impl FailAt {
    fn maybe_fail<C: Communicator>(
        &self,
        frag: &Fragment<f64>,
        phase: Phase,
        messages: &MessageManager<C, f64, f64>,
    ) -> Result<(), EngineError> {
        if frag.fid() != self.victim || phase != self.phase {
            return Ok(());
        }
        if self.panic {
            panic!("partition {} gave up in {phase:?}", self.victim);
        }
        messages.send_to(frag, vid(999), 0.0)
    }
}

impl IncrementalProgram for FailAt {
    type Edge = f64;
    type Value = f64;
    type Message = f64;
    type Context = ();

    fn buffering(&self) -> Buffering {
        Buffering::InPlace
    }

    fn initial_value(&self) -> f64 {
        0.0
    }

    fn init<C: Communicator>(
        &self,
        frag: &Fragment<f64>,
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        self.maybe_fail(frag, Phase::Init, round.messages)
    }

    fn peval<C: Communicator>(
        &self,
        frag: &Fragment<f64>,
        _ctx: &mut (),
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        round.messages.force_continue();
        self.maybe_fail(frag, Phase::PEval, round.messages)
    }

    fn inc_eval<C: Communicator>(
        &self,
        frag: &Fragment<f64>,
        _ctx: &mut (),
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        round.messages.force_continue();
        self.maybe_fail(frag, Phase::IncEval(round.step), round.messages)
    }

    fn finalize<C: Communicator>(
        &self,
        frag: &Fragment<f64>,
        _ctx: &mut (),
        round: &mut ProgramRound<'_, C, Self>,
    ) -> Result<(), EngineError> {
        self.maybe_fail(frag, Phase::Finalize, round.messages)
    }
}

#[test]
fn failure_in_any_phase_reaches_the_caller() {
    let g = random_graph(30, 0.1, 2);
    let config = EngineConfig::default().with_max_rounds(5).unwrap();
    let phases = [
        Phase::Init,
        Phase::PEval,
        Phase::IncEval(1),
        Phase::IncEval(3),
        Phase::Finalize,
    ];
    for phase in phases {
        for victim in [0, 2] {
            let prog = FailAt {
                victim,
                phase,
                panic: false,
            };
            let err = run(&g, 3, config.clone(), &prog).unwrap_err();
            assert_eq!(err, EngineError::UnknownVertex(vid(999)), "{phase:?} on {victim}");
        }
    }
}

#[test]
fn healthy_run_hits_the_bound() {
    let g = random_graph(30, 0.1, 2);
    let config = EngineConfig::default().with_max_rounds(5).unwrap();
    let prog = FailAt {
        victim: 7,
        phase: Phase::Init,
        panic: false,
    };
    let out = run(&g, 3, config, &prog).unwrap();
    assert_eq!(out.report.inc_rounds, 5);
}

#[test]
#[should_panic(expected = "gave up")]
fn panic_in_one_partition_is_propagated() {
    let g = random_graph(30, 0.1, 2);
    let prog = FailAt {
        victim: 1,
        phase: Phase::IncEval(2),
        panic: true,
    };
    let _ = run(&g, 3, EngineConfig::default(), &prog);
}
