use casino::roulette::{BetLedger, board, generate_board, settle};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

/// Ledger with one wager on each of the first `n` cells of the board
fn ledger_with_wagers(n: usize) -> BetLedger {
    let mut ledger = BetLedger::new();
    for cell in board().cells().take(n) {
        ledger.place_bet(cell, 10).unwrap();
    }
    ledger
}

/// Benchmark generating the full board from scratch
fn bench_generate_board(c: &mut Criterion) {
    c.bench_function("generate_board", |b| {
        b.iter(generate_board);
    });
}

/// Benchmark resolving a client cell to its canonical board cell
fn bench_find_cell(c: &mut Criterion) {
    let key = board().corner_bets.last().unwrap().key();
    c.bench_function("board_find_corner", |b| {
        b.iter(|| board().find(black_box(&key)));
    });
}

/// Benchmark settlement for growing ledgers
fn bench_settle(c: &mut Criterion) {
    let mut group = c.benchmark_group("settle");

    for wagers in [1, 10, 50, 151] {
        let ledger = ledger_with_wagers(wagers);
        group.bench_with_input(BenchmarkId::from_parameter(wagers), &ledger, |b, ledger| {
            b.iter(|| settle(black_box(17), ledger));
        });
    }

    group.finish();
}

/// Benchmark placing and removing a wager
fn bench_place_remove(c: &mut Criterion) {
    let cell = board().straight(17).unwrap();
    let mut ledger = ledger_with_wagers(20);

    c.bench_function("ledger_place_remove", |b| {
        b.iter(|| {
            ledger.place_bet(cell, black_box(25)).unwrap();
            ledger.remove_bet(cell, black_box(25))
        });
    });
}

criterion_group!(board_benches, bench_generate_board, bench_find_cell);
criterion_group!(ledger_benches, bench_settle, bench_place_remove);
criterion_main!(board_benches, ledger_benches);
