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

//! An abstract interpreter that tracks the EVM operand stack of a program without executing
//! its side effects. Values are known only when they come from PUSH immediates (and DUP, SWAP
//! or ADD of known values); everything else is opaque. That is enough to follow the jumps the
//! generator emits, check stack bounds, and count which opcodes actually run.

use crate::disasm::jump_destinations;
use crate::program::SynthesizedProgram;
use opbench_common::OpcodeTable;
use opbench_common::opcode::{
    self, ADD, DUP1, INVALID, JUMP, JUMPI, MAX_STACK_DEPTH, PUSH0, RETURN, REVERT, SELFDESTRUCT,
    STOP, SWAP1,
};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("stack underflow at pc {pc}: {opcode:#04x} needs more than {depth} items")]
    Underflow { pc: usize, opcode: u8, depth: usize },
    #[error("stack overflow at pc {pc}")]
    Overflow { pc: usize },
    #[error("undefined opcode {opcode:#04x} at pc {pc}")]
    UnknownOpcode { pc: usize, opcode: u8 },
    #[error("jump at pc {pc} targets {destination:#x}, which is not a JUMPDEST")]
    BadDestination { pc: usize, destination: u64 },
    #[error("jump at pc {pc} has a computed destination")]
    DynamicJump { pc: usize },
    #[error("conditional jump at pc {pc} depends on a computed value")]
    DynamicCondition { pc: usize },
    #[error("gave up after {0} steps")]
    StepLimit(usize),
    #[error("{opcode:#04x} executed {actual} times, expected {expected}")]
    ExecutionCount {
        opcode: u8,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    /// Executions per opcode byte.
    pub executed: BTreeMap<u8, usize>,
    pub steps: usize,
    pub max_depth: usize,
    pub final_depth: usize,
}

impl Trace {
    pub fn count(&self, opcode: u8) -> usize {
        self.executed.get(&opcode).copied().unwrap_or(0)
    }
}

pub struct StackSimulator<'a> {
    table: &'a OpcodeTable,
    step_limit: usize,
}

impl<'a> StackSimulator<'a> {
    pub fn new(table: &'a OpcodeTable) -> Self {
        Self {
            table,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn run(&self, code: &[u8]) -> Result<Trace, SimulationError> {
        let destinations = jump_destinations(code);
        let mut stack: Vec<Option<u64>> = Vec::with_capacity(64);
        let mut trace = Trace::default();
        let mut pc = 0;

        while pc < code.len() {
            if trace.steps == self.step_limit {
                return Err(SimulationError::StepLimit(self.step_limit));
            }
            trace.steps += 1;

            let op = code[pc];
            let spec = self
                .table
                .by_value(op)
                .ok_or(SimulationError::UnknownOpcode { pc, opcode: op })?;
            *trace.executed.entry(op).or_default() += 1;
            if stack.len() < spec.removed {
                return Err(SimulationError::Underflow {
                    pc,
                    opcode: op,
                    depth: stack.len(),
                });
            }

            let mut next = pc + 1 + opcode::immediate_len(op);
            match op {
                STOP | RETURN | REVERT | INVALID | SELFDESTRUCT => {
                    stack.truncate(stack.len() - spec.removed);
                    break;
                }
                PUSH0 => stack.push(Some(0)),
                _ if opcode::is_push(op) => stack.push(immediate(code, pc)),
                _ if opcode::is_dup(op) => {
                    let depth = (op - DUP1 + 1) as usize;
                    stack.push(stack[stack.len() - depth]);
                }
                _ if opcode::is_swap(op) => {
                    let depth = (op - SWAP1 + 1) as usize;
                    let top = stack.len() - 1;
                    stack.swap(top, top - depth);
                }
                ADD => {
                    let (a, b) = (stack.pop().flatten(), stack.pop().flatten());
                    stack.push(a.zip(b).map(|(a, b)| a.wrapping_add(b)));
                }
                JUMP | JUMPI => {
                    let destination = stack
                        .pop()
                        .flatten()
                        .ok_or(SimulationError::DynamicJump { pc })?;
                    let taken = if op == JUMPI {
                        stack
                            .pop()
                            .flatten()
                            .ok_or(SimulationError::DynamicCondition { pc })?
                            != 0
                    } else {
                        true
                    };
                    if taken {
                        let valid = usize::try_from(destination)
                            .ok()
                            .and_then(|d| destinations.get(d).copied())
                            .unwrap_or(false);
                        if !valid {
                            return Err(SimulationError::BadDestination { pc, destination });
                        }
                        next = destination as usize;
                    }
                }
                _ => {
                    stack.truncate(stack.len() - spec.removed);
                    stack.extend(std::iter::repeat_n(None, spec.added));
                }
            }

            if stack.len() > MAX_STACK_DEPTH {
                return Err(SimulationError::Overflow { pc });
            }
            trace.max_depth = trace.max_depth.max(stack.len());
            pc = next;
        }

        trace.final_depth = stack.len();
        Ok(trace)
    }
}

/// The value pushed by the PUSH at `pc`, reading past the end of the code as zeros.
fn immediate(code: &[u8], pc: usize) -> Option<u64> {
    let width = opcode::immediate_len(code[pc]);
    let bytes = (0..width).map(|i| code.get(pc + 1 + i).copied().unwrap_or(0));
    let mut value = 0u64;
    for (i, b) in bytes.enumerate() {
        if i < width.saturating_sub(8) {
            if b != 0 {
                return None;
            }
            continue;
        }
        value = (value << 8) | u64::from(b);
    }
    Some(value)
}

/// Simulate a program and check that its target ran exactly as often as it claims.
pub fn verify(table: &OpcodeTable, program: &SynthesizedProgram) -> Result<Trace, SimulationError> {
    let trace = StackSimulator::new(table).run(&program.bytecode)?;
    if let Some(expected) = program.expected {
        let actual = trace.count(expected.opcode);
        if actual != expected.count {
            return Err(SimulationError::ExecutionCount {
                opcode: expected.opcode,
                expected: expected.count,
                actual,
            });
        }
    }
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(code: &str) -> Result<Trace, SimulationError> {
        let table = OpcodeTable::builtin().unwrap();
        StackSimulator::new(&table).run(&hex::decode(code).unwrap())
    }

    #[test]
    fn counts_and_depth() {
        // PUSH1 1, PUSH1 2, ADD, POP
        let trace = run("600160020150").unwrap();
        assert_eq!(trace.count(0x01), 1);
        assert_eq!(trace.max_depth, 2);
        assert_eq!(trace.final_depth, 0);
    }

    #[test]
    fn underflow_is_reported() {
        assert_eq!(
            run("600101"),
            Err(SimulationError::Underflow {
                pc: 2,
                opcode: 0x01,
                depth: 1
            })
        );
    }

    #[test]
    fn jumps_are_followed() {
        // PUSH1 4, JUMP, INVALID, JUMPDEST, PUSH1 0, PUSH1 10, JUMPI, JUMPDEST
        let trace = run("600456fe5b6000600a575b").unwrap();
        assert_eq!(trace.count(0xfe), 0);
        assert_eq!(trace.count(0x57), 1);
        assert_eq!(trace.count(0x5b), 2);
    }

    #[test]
    fn jump_into_push_data_is_rejected() {
        // PUSH1 3, JUMP, PUSH1 0x5b
        assert_eq!(
            run("600356605b"),
            Err(SimulationError::BadDestination {
                pc: 2,
                destination: 3
            })
        );
    }

    #[test]
    fn computed_destinations_are_rejected() {
        // CALLVALUE, JUMP
        assert_eq!(run("3456"), Err(SimulationError::DynamicJump { pc: 1 }));
    }

    #[test]
    fn wide_pushes_are_opaque() {
        let code = format!("7f{}600101", "ff".repeat(32));
        let trace = run(&code).unwrap();
        assert_eq!(trace.final_depth, 1);
    }
}
