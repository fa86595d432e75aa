// crates/laskar-core/tests/snake_props.rs: invariants held by random play and by the step gate.
use laskar_core::config::SnakeConfig;
use laskar_core::game_loop::StepGate;
use laskar_core::rng::{EntropySource, SpawnLcg};
use laskar_core::snake::{Direction, Game, Phase, StepEvent};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;

const CAP: usize = 64;

fn direction() -> impl Strategy<Value = Option<Direction>> {
    prop_oneof![
        3 => Just(None),
        1 => prop::sample::select(Direction::ALL.to_vec()).prop_map(Some),
    ]
}

struct Counter(u16);

impl EntropySource for Counter {
    fn jitter(&mut self) -> u16 {
        self.0 = self.0.wrapping_sub(977);
        self.0
    }
}

proptest! {
    #[test]
    fn random_play_keeps_body_and_target_consistent(
        seed in any::<u64>(),
        turns in prop::collection::vec(direction(), 1..300),
    ) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut game = Game::<CAP>::new(&SnakeConfig::default(), &mut rng).unwrap();

        for turn in turns {
            if let Some(direction) = turn {
                game.steer(direction);
            }
            let before = game.length();
            let previous = game.direction();
            let event = game.step(&mut rng);

            prop_assert_ne!(game.direction(), previous.opposite());
            match event {
                StepEvent::Ate => prop_assert_eq!(game.length(), before + 1),
                _ => prop_assert_eq!(game.length(), before),
            }
            if game.phase().is_terminal() {
                break;
            }

            let cells: Vec<_> = game.body().iter().collect();
            prop_assert!(!game.body().contains(game.target()));
            prop_assert!(game.arena().is_interior(game.target()));
            for (index, cell) in cells.iter().enumerate() {
                prop_assert!(game.arena().is_interior(*cell));
                prop_assert!(!cells[index + 1..].contains(cell));
            }
        }
    }

    #[test]
    fn terminal_games_are_frozen(seed in any::<u64>(), extra in 1usize..20) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut game = Game::<CAP>::new(&SnakeConfig::default(), &mut rng).unwrap();
        // Heading right with no input always reaches the wall.
        while game.phase() == Phase::Running {
            game.step(&mut rng);
        }
        let snapshot: Vec<_> = game.body().iter().collect();
        let target = game.target();
        let steps = game.steps();
        for _ in 0..extra {
            game.steer(Direction::Up);
            prop_assert_eq!(game.step(&mut rng), StepEvent::Halted);
        }
        prop_assert_eq!(game.body().iter().collect::<Vec<_>>(), snapshot);
        prop_assert_eq!(game.target(), target);
        prop_assert_eq!(game.steps(), steps);
    }

    #[test]
    fn spawn_generator_feeds_the_game(seed in any::<u16>(), noise in any::<u16>()) {
        let mut lcg = SpawnLcg::new(seed);
        let mut entropy = Counter(noise);
        let game = Game::<CAP>::new(&SnakeConfig::default(), &mut lcg.with_entropy(&mut entropy))
            .unwrap();
        prop_assert!(game.arena().is_interior(game.target()));
        prop_assert!(!game.body().contains(game.target()));
    }

    #[test]
    fn gate_opens_once_per_elapsed_cadence(
        cadence in 1u64..16,
        start in 0u64..1_000,
        advances in prop::collection::vec(0u64..2, 1..500),
    ) {
        let mut gate = StepGate::new(start, cadence);
        let mut now = start;
        let mut opened = 0u64;
        for advance in advances {
            now += advance;
            if gate.take(now) {
                opened += 1;
            }
            // Single-tick advances never leave the gate behind.
            prop_assert!(gate.next_deadline() > now);
            prop_assert_eq!(opened, (now - start) / cadence);
        }
    }
}
