// tests/property/main.rs

use asyncproc::{AsyncProc, Gate, Port, ProcState};
use asyncproc_test_utils::builders::manual_scope;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Start,
    AddGate { ready: bool, active: bool },
    Block(usize),
    Unblock(usize),
    SetActive(usize, bool),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Start),
        2 => (any::<bool>(), any::<bool>()).prop_map(|(ready, active)| Op::AddGate { ready, active }),
        3 => any::<usize>().prop_map(Op::Block),
        4 => any::<usize>().prop_map(Op::Unblock),
        2 => (any::<usize>(), any::<bool>()).prop_map(|(i, a)| Op::SetActive(i, a)),
    ]
}

/// Reference model: the gate table as plain data, recounted after every step.
struct Model {
    state: ProcState,
    /// `(ready, active)`; index 0 is the control gate.
    gates: Vec<(bool, bool)>,
    fired: usize,
}

impl Model {
    fn new() -> Self {
        Self {
            state: ProcState::Created,
            gates: vec![(false, true)],
            fired: 0,
        }
    }

    fn closed(&self) -> usize {
        self.gates.iter().filter(|(ready, active)| *active && !ready).count()
    }

    /// Fire if every active gate is open, taking the control token back.
    fn settle(&mut self) {
        if self.state == ProcState::Blocked && self.closed() == 0 {
            self.state = ProcState::Running;
            self.gates[0].0 = false;
            self.fired += 1;
        }
    }
}

fn apply(op: &Op, proc: &AsyncProc, gates: &mut Vec<Gate>, model: &mut Model) {
    match *op {
        Op::Start => {
            proc.start();
            if model.state == ProcState::Created {
                model.state = ProcState::Blocked;
                model.gates[0].0 = true;
            }
        }
        Op::AddGate { ready, active } => match proc.gate(ready, active) {
            Ok(gate) => {
                assert!(model.state.accepts_gates());
                gates.push(gate);
                model.gates.push((ready, active));
            }
            Err(_) => assert_eq!(model.state, ProcState::Running),
        },
        Op::Block(i) if !gates.is_empty() => {
            let i = i % gates.len();
            gates[i].block();
            model.gates[i + 1].0 = false;
        }
        Op::Unblock(i) if !gates.is_empty() => {
            let i = i % gates.len();
            gates[i].unblock();
            model.gates[i + 1].0 = true;
        }
        Op::SetActive(i, active) if !gates.is_empty() => {
            let i = i % gates.len();
            gates[i].set_active(active);
            model.gates[i + 1].1 = active;
        }
        _ => {}
    }
    model.settle();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn maintained_count_matches_the_gate_table(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let (scope, executor) = manual_scope();
        let proc = AsyncProc::builder().scope(&scope).build_with_action(|| Ok(()));
        let mut gates = Vec::new();
        let mut model = Model::new();

        for op in &ops {
            apply(op, &proc, &mut gates, &mut model);

            let snap = proc.snapshot();
            prop_assert_eq!(snap.state, model.state, "after {:?}", op);
            prop_assert_eq!(snap.closed_gates, model.closed(), "after {:?}", op);
            prop_assert_eq!(snap.recount(), snap.closed_gates);
            prop_assert_eq!(executor.submitted(), model.fired);
        }

        prop_assert!(model.fired <= 1);
    }

    #[test]
    fn proc_fires_once_when_all_gates_open(
        initial in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..12),
        order in proptest::collection::vec(any::<usize>(), 0..24),
    ) {
        let (scope, executor) = manual_scope();
        let proc = AsyncProc::builder().scope(&scope).build_with_action(|| Ok(()));
        let gates: Vec<Gate> = initial
            .iter()
            .map(|&(ready, active)| proc.gate(ready, active).unwrap())
            .collect();
        proc.start();

        // Open gates in an arbitrary order, then make sure all are open.
        for i in order {
            if !gates.is_empty() {
                gates[i % gates.len()].unblock();
            }
        }
        for gate in &gates {
            gate.unblock();
        }

        prop_assert_eq!(executor.submitted(), 1);
        prop_assert_eq!(proc.state(), ProcState::Running);
        prop_assert_eq!(executor.run_all(), 1);
        prop_assert!(proc.is_completed());
        prop_assert!(scope.completion().is_completed());
    }
}
