use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use house_poker::{
    Room, RoomSettings,
    entities::{Action, Card, Deck, PlayerId, RoomCode, Suit},
    functional::{argmax, eval, score_five},
};
use rand::{SeedableRng, rngs::StdRng};

/// Room with `n` players, first hand dealt
fn setup_room_with_players(n: usize) -> Room {
    let mut room = Room::with_seed(
        RoomCode::new(100_001).unwrap(),
        PlayerId::from("player0"),
        "player0".into(),
        RoomSettings::new(1000, 10, false),
        42,
    )
    .unwrap();
    for i in 1..n {
        let name = format!("player{i}");
        room.seat_player(PlayerId::from(name.as_str()), name.as_str().into())
            .unwrap();
    }
    room.start_game(&PlayerId::from("player0")).unwrap();
    room
}

/// Seven-card hands dealt from seeded shuffles
fn dealt_hands(count: usize) -> Vec<Vec<Card>> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|_| {
            let mut deck = Deck::default();
            deck.shuffle_with(&mut rng);
            deck.cards()[..7].to_vec()
        })
        .collect()
}

fn bench_score_five(c: &mut Criterion) {
    let cards = [
        Card(14, Suit::Spade),
        Card(13, Suit::Spade),
        Card(12, Suit::Spade),
        Card(11, Suit::Spade),
        Card(10, Suit::Spade),
    ];

    c.bench_function("score_five_royal_flush", |b| {
        b.iter(|| score_five(&cards));
    });
}

fn bench_hand_eval_7_cards(c: &mut Criterion) {
    let cards = vec![
        Card(14, Suit::Spade),  // Pocket: Ace of Spades
        Card(13, Suit::Spade),  // Pocket: King of Spades
        Card(12, Suit::Spade),  // Board: Queen of Spades
        Card(11, Suit::Spade),  // Board: Jack of Spades
        Card(10, Suit::Spade),  // Board: 10 of Spades (royal flush)
        Card(2, Suit::Heart),   // Board: 2 of Hearts
        Card(3, Suit::Diamond), // Board: 3 of Diamonds
    ];

    c.bench_function("hand_eval_7_cards", |b| {
        b.iter(|| eval(&cards));
    });
}

fn bench_hand_eval_100_dealt(c: &mut Criterion) {
    let hands = dealt_hands(100);

    c.bench_function("hand_eval_100_dealt", |b| {
        b.iter(|| hands.iter().map(|cards| eval(cards)).collect::<Vec<_>>());
    });
}

fn bench_showdown_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("showdown_comparison");

    for n_players in [2, 6, 10] {
        let strengths: Vec<_> = dealt_hands(n_players)
            .iter()
            .filter_map(|cards| eval(cards).ok())
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n_players}_players")),
            &strengths,
            |b, strengths| {
                b.iter(|| argmax(strengths));
            },
        );
    }

    group.finish();
}

fn bench_view_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_generation");

    for n_players in [2, 4, 6, 8, 10] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n_players}_players")),
            &n_players,
            |b, &n| {
                let room = setup_room_with_players(n);
                let viewer = PlayerId::from("player0");
                b.iter(|| room.view_for(Some(&viewer)));
            },
        );
    }

    group.finish();
}

fn bench_hand_start(c: &mut Criterion) {
    c.bench_function("fold_around_and_deal", |b| {
        b.iter_batched(
            || setup_room_with_players(6),
            |mut room| {
                while let Some(player) = room.current_player() {
                    let id = player.id.clone();
                    if room.take_action(&id, Action::Fold).is_err() {
                        break;
                    }
                }
                room.start_new_hand()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    hand_evaluation,
    bench_score_five,
    bench_hand_eval_7_cards,
    bench_hand_eval_100_dealt,
    bench_showdown_comparison,
);

criterion_group!(room_operations, bench_view_generation, bench_hand_start);

criterion_main!(hand_evaluation, room_operations);
