// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The stack scaffold wrapped around generic occurrences of an opcode.
//!
//! For a batch budget B and an opcode producing K results, every program of the batch pushes
//! the same B·K void items and the same arguments, and pops exactly B·K items. Only how the pops
//! interleave with the N occurrences changes.

use crate::emit::Emitter;
use crate::operand::Operand;
use opbench_common::{OpcodeSpec, StackEffect};

/// Push and pop counts for one N of a batch.
///
/// The counts are the same for every N. The stack left behind after the trailing pops is not:
/// it holds (B−N)·consumed unused arguments plus N·K results, so its depth varies with N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaffoldPlan {
    pub budget: usize,
    pub op_count: usize,
    /// K, results left by each occurrence.
    pub results: usize,
    pub void_pushes: usize,
    pub argument_pushes: usize,
    /// Pops placed between consecutive occurrences, in total.
    pub interleaved_pops: usize,
    pub trailing_pops: usize,
}

impl ScaffoldPlan {
    pub fn new(effect: StackEffect, op_count: usize, budget: usize) -> Self {
        assert!(
            op_count <= budget,
            "scaffold for N={op_count} exceeds its budget B={budget}"
        );
        let results = effect.produced;
        let drained = budget * results;
        let interleaved_pops = op_count.saturating_sub(1) * results;
        let plan = Self {
            budget,
            op_count,
            results,
            void_pushes: drained,
            argument_pushes: Self::arguments_for(effect, budget),
            interleaved_pops,
            trailing_pops: drained - interleaved_pops,
        };
        assert_eq!(
            plan.interleaved_pops + plan.trailing_pops,
            budget * results,
            "unbalanced scaffold: N={op_count} B={budget} K={results}"
        );
        plan
    }

    /// Stack items the arguments occupy before the first occurrence. Consumed arguments are
    /// provided once per occurrence the budget allows, so a zero budget pushes none.
    pub fn arguments_for(effect: StackEffect, budget: usize) -> usize {
        if effect.consumed > 0 {
            budget * effect.consumed
        } else {
            effect.required
        }
    }

    pub fn total_pushes(&self) -> usize {
        self.void_pushes + self.argument_pushes
    }

    pub fn total_pops(&self) -> usize {
        self.interleaved_pops + self.trailing_pops
    }

    /// Deepest the stack gets, counting from whatever lies beneath the scaffold.
    pub fn peak_depth(&self) -> usize {
        self.total_pushes() + self.results
    }
}

/// Occurrences of one opcode presented through the scaffold.
#[derive(Debug, Clone)]
pub struct Scaffold {
    op: u8,
    immediate: Vec<u8>,
    effect: StackEffect,
    /// One occurrence's arguments, first logical argument (top of stack) first.
    arguments: Vec<Operand>,
    budget: usize,
}

impl Scaffold {
    pub fn new(
        spec: &OpcodeSpec,
        arguments: Vec<Operand>,
        immediate: Vec<u8>,
        budget: usize,
    ) -> Self {
        let effect = spec.stack_effect();
        assert_eq!(
            arguments.len(),
            effect.required,
            "{} takes {} scaffold arguments",
            spec.mnemonic,
            effect.required
        );
        assert_eq!(immediate.len(), spec.immediate.unwrap_or(0));
        Self {
            op: spec.value,
            immediate,
            effect,
            arguments,
            budget,
        }
    }

    pub fn plan(&self, op_count: usize) -> ScaffoldPlan {
        ScaffoldPlan::new(self.effect, op_count, self.budget)
    }

    fn occurrence(&self, e: &mut Emitter) {
        e.op(self.op);
        e.raw(&self.immediate);
    }

    pub fn emit(&self, op_count: usize, e: &mut Emitter) {
        let plan = self.plan(op_count);
        let zero = Operand::zero();
        for _ in 0..plan.void_pushes {
            e.push(&zero);
        }

        // Items consumed per occurrence are provided for every occurrence the budget allows;
        // items only read (DUP, SWAP) are provided once.
        let groups = if self.effect.consumed > 0 {
            self.budget
        } else {
            1
        };
        for _ in 0..groups {
            for argument in self.arguments.iter().rev() {
                e.push(argument);
            }
        }
        assert_eq!(
            groups * self.arguments.len(),
            plan.argument_pushes,
            "scaffold arguments disagree with the plan: N={op_count} B={}",
            self.budget
        );

        if op_count > 0 {
            self.occurrence(e);
            for _ in 1..op_count {
                e.pop(plan.results);
                self.occurrence(e);
            }
        }
        e.pop(plan.trailing_pops);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const ADD: StackEffect = StackEffect {
        required: 2,
        consumed: 2,
        produced: 1,
    };

    #[test_case(0, 10, 0, 10; "no occurrences drains everything")]
    #[test_case(5, 10, 4, 6; "half the budget")]
    #[test_case(10, 10, 9, 1; "full budget")]
    fn add_plan(op_count: usize, budget: usize, interleaved: usize, trailing: usize) {
        let plan = ScaffoldPlan::new(ADD, op_count, budget);
        assert_eq!(plan.interleaved_pops, interleaved);
        assert_eq!(plan.trailing_pops, trailing);
        assert_eq!(plan.void_pushes, 10);
        assert_eq!(plan.argument_pushes, 20);
    }

    #[test]
    fn pushes_and_pops_do_not_depend_on_n() {
        let effect = StackEffect {
            required: 3,
            consumed: 3,
            produced: 2,
        };
        let plans: Vec<_> = (0..=8).map(|n| ScaffoldPlan::new(effect, n, 8)).collect();
        for plan in &plans {
            assert_eq!(plan.total_pushes(), plans[0].total_pushes());
            assert_eq!(plan.total_pops(), 16);
        }
    }

    #[test]
    fn read_only_arguments_are_pushed_once() {
        let dup16 = StackEffect {
            required: 16,
            consumed: 0,
            produced: 1,
        };
        assert_eq!(ScaffoldPlan::arguments_for(dup16, 50), 16);
    }

    #[test]
    fn leftover_depth_follows_n() {
        let leftovers: Vec<_> = (0..=10)
            .map(|n| {
                let plan = ScaffoldPlan::new(ADD, n, 10);
                plan.total_pushes() - n * ADD.consumed + n * ADD.produced - plan.total_pops()
            })
            .collect();
        let expected: Vec<_> = (0..=10).map(|n| (10 - n) * 2 + n).collect();
        assert_eq!(leftovers, expected);
    }

    #[test]
    fn zero_budget_emits_nothing() {
        let table = opbench_common::OpcodeTable::builtin().unwrap();
        let add = table.resolve("ADD").unwrap();
        let scaffold = Scaffold::new(
            add,
            vec![Operand::word(1, 1), Operand::word(2, 1)],
            vec![],
            0,
        );
        let plan = scaffold.plan(0);
        assert_eq!(plan.total_pushes(), 0);
        assert_eq!(plan.total_pops(), 0);
        let mut e = Emitter::new();
        scaffold.emit(0, &mut e);
        assert!(e.finish().unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "exceeds its budget")]
    fn op_count_beyond_budget_panics() {
        ScaffoldPlan::new(ADD, 11, 10);
    }
}
