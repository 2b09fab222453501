//! Auto-pay solver benchmarks
//!
//! Measures the greedy resolver on commander-sized boards: a pile of basics,
//! some dual lands and rocks, and a signet whose activation cost has to be
//! paid from other sources.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mtg_mana_engine::{
    board::{Battlefield, Permanent},
    config::EngineConfig,
    core::{CardFace, CardType, ManaPool, ObjectId, ParsedCost, PlayerId, RuleBook},
    game::{build_catalog, GreedyManaResolver, ManaEngine, ManaPaymentResolver, PaymentRequest},
};

fn player() -> PlayerId {
    PlayerId::new(1)
}

/// `lands` basics spread over the five colors plus a fixed set of rocks and duals
fn commander_board(lands: u32) -> Battlefield {
    let basics = ["Plains", "Island", "Swamp", "Mountain", "Forest"];
    let mut board = Battlefield::new();
    let mut next_id = 1;
    let mut add = |board: &mut Battlefield, card: CardFace| {
        board.add(Permanent::new(ObjectId::new(next_id), card, player()));
        next_id += 1;
    };

    for i in 0..lands {
        add(&mut board, CardFace::basic_land(basics[i as usize % basics.len()]));
    }
    add(
        &mut board,
        CardFace::new("Tundra")
            .with_type(CardType::Land)
            .with_subtype("Plains")
            .with_subtype("Island"),
    );
    add(
        &mut board,
        CardFace::new("Sol Ring")
            .with_type(CardType::Artifact)
            .with_text("{T}: Add {C}{C}."),
    );
    add(
        &mut board,
        CardFace::new("Azorius Signet")
            .with_type(CardType::Artifact)
            .with_text("{1}, {T}: Add {W}{U}."),
    );
    add(
        &mut board,
        CardFace::new("City of Brass")
            .with_type(CardType::Land)
            .with_text("{T}: Add one mana of any color."),
    );
    board
}

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver");
    let costs = ["{2}{G}", "{W}{U}{B}{R}{G}", "{4}{W/U}{W/U}", "{10}"];

    for lands in [5u32, 20, 40] {
        let board = commander_board(lands);
        let catalog = build_catalog(&board.permanents, player(), &RuleBook::new(), Default::default());

        for cost in costs {
            let parsed = ParsedCost::parse(cost);
            group.bench_with_input(BenchmarkId::new(cost, lands), &parsed, |b, parsed| {
                let resolver = GreedyManaResolver::new();
                b.iter(|| {
                    let request = PaymentRequest::new(parsed, &catalog.available, ManaPool::new());
                    black_box(resolver.check_payment(black_box(&request)))
                });
            });
        }
    }
    group.finish();
}

fn bench_engine_round_trip(c: &mut Criterion) {
    let board = commander_board(20);
    c.bench_function("engine auto_pay + undo", |b| {
        let mut engine = ManaEngine::new(player(), EngineConfig::default());
        b.iter(|| {
            let outcome = engine.auto_pay(&board, "{3}{W}{U}", 0);
            black_box(&outcome);
            engine.undo();
        });
    });
}

criterion_group!(benches, bench_solver, bench_engine_round_trip);
criterion_main!(benches);
