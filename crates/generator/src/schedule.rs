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

//! Repeat-count schedules: which values of N one batch emits programs for.

use serde::{Deserialize, Serialize};

pub const DEFAULT_OP_COUNT: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// 0, n and 2n.
    Triplet { op_count: usize },
    /// 0, step, 2·step and so on, up to and including max.
    Stepped { max: usize, step: usize },
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Triplet {
            op_count: DEFAULT_OP_COUNT,
        }
    }
}

impl Schedule {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Schedule::Stepped { step: 0, .. } => Err("step must be at least one".to_string()),
            _ => Ok(()),
        }
    }

    /// The repeat counts, in ascending order.
    pub fn counts(&self) -> Vec<usize> {
        match *self {
            Schedule::Triplet { op_count } => vec![0, op_count, 2 * op_count],
            Schedule::Stepped { max, step } => (0..=max).step_by(step.max(1)).collect(),
        }
    }

    /// M, the budget every program of the batch is laid out for.
    pub fn batch_max(&self) -> usize {
        match *self {
            Schedule::Triplet { op_count } => 2 * op_count,
            Schedule::Stepped { max, .. } => max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(Schedule::Triplet { op_count: 5 }, vec![0, 5, 10], 10)]
    #[test_case(Schedule::Stepped { max: 10, step: 5 }, vec![0, 5, 10], 10)]
    #[test_case(Schedule::Stepped { max: 7, step: 3 }, vec![0, 3, 6], 7; "max off the step grid")]
    fn counts(schedule: Schedule, counts: Vec<usize>, batch_max: usize) {
        assert_eq!(schedule.counts(), counts);
        assert_eq!(schedule.batch_max(), batch_max);
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(Schedule::Stepped { max: 3, step: 0 }.validate().is_err());
    }
}
