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

//! Throughput of batch synthesis across the strategies.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use opbench_common::OpcodeTable;
use opbench_generator::{ArgumentSizes, Generator, Schedule};

fn synthesize(c: &mut Criterion) {
    let table = OpcodeTable::builtin().unwrap();
    let schedule = Schedule::Stepped { max: 256, step: 32 };
    let mut group = c.benchmark_group("synthesize");
    group.throughput(Throughput::Elements(schedule.counts().len() as u64));

    for mnemonic in ["ADD", "MSTORE", "JUMPI", "CALL", "SSTORE_COLD_CHANGE", "SHA2-256"] {
        group.bench_with_input(
            BenchmarkId::from_parameter(mnemonic),
            &mnemonic,
            |b, mnemonic| {
                let mut generator = Generator::new(&table, 0);
                b.iter(|| {
                    let programs = generator
                        .schedule(mnemonic, &schedule, false, &ArgumentSizes::Random)
                        .unwrap();
                    black_box(programs)
                });
            },
        );
    }
    group.finish();
}

fn verify(c: &mut Criterion) {
    let table = OpcodeTable::builtin().unwrap();
    let programs = Generator::new(&table, 0)
        .batch("MLOAD", &[256], 256, &ArgumentSizes::Random)
        .unwrap();
    c.bench_function("verify_mload_256", |b| {
        b.iter(|| black_box(opbench_generator::verify(&table, &programs[0]).unwrap()))
    });
}

criterion_group!(benches, synthesize, verify);
criterion_main!(benches);
