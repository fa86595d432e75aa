// crates/laskar-core/src/game_loop.rs: fixed-timestep driver tying the clock, polled keys and a canvas to a Game.
use crate::clock::TickSource;
use crate::config::{ConfigError, SnakeConfig};
use crate::rng::{EntropySource, SpawnLcg};
use crate::snake::{Arena, Cell, Direction, Game, Phase, StepEvent};

pub const WALL_GLYPH: u8 = b'#';
pub const BODY_GLYPH: u8 = b'@';
pub const TARGET_GLYPH: u8 = b'x';
pub const SCORE_CELL: Cell = Cell::new(0, 0);

/// VGA-style attribute byte: background in the high nibble, foreground in the low one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Style(pub u8);

impl Style {
    pub const TEXT: Self = Self(0x07);
    pub const WALL: Self = Self(0x0d);
    pub const BODY: Self = Self(0x02);
    pub const TARGET: Self = Self(0x0c);
    pub const SCORE: Self = Self(0x03);

    pub const fn foreground(self) -> u8 {
        self.0 & 0x0f
    }

    pub const fn background(self) -> u8 {
        self.0 >> 4
    }
}

pub trait Canvas {
    fn draw_glyph(&mut self, glyph: u8, at: Cell, style: Style);
    /// Blanks every cell in the inclusive rectangle `from..=to`.
    fn clear_region(&mut self, from: Cell, to: Cell);
    fn clear_full_screen(&mut self);
    fn draw_number(&mut self, value: u32, at: Cell, style: Style);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Steer(Direction),
    Quit,
}

/// Non-blocking key input. `read_raw_input` returns `None` when nothing is pending.
pub trait KeySource {
    type Raw;

    fn read_raw_input(&mut self) -> Option<Self::Raw>;
    fn translate(&mut self, raw: Self::Raw) -> Option<Key>;

    fn poll_key(&mut self) -> Option<Key> {
        let raw = self.read_raw_input()?;
        self.translate(raw)
    }
}

/// Lets a caller through once per `cadence` ticks. A late poll is paid back one step per call
/// at fixed increments of the deadline; owed steps are never skipped or merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepGate {
    next_deadline: u64,
    cadence: u64,
}

impl StepGate {
    pub const fn new(now: u64, cadence: u64) -> Self {
        Self {
            next_deadline: now.saturating_add(cadence),
            cadence,
        }
    }

    pub const fn is_due(&self, now: u64) -> bool {
        now >= self.next_deadline
    }

    pub fn take(&mut self, now: u64) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.next_deadline = self.next_deadline.saturating_add(self.cadence);
        true
    }

    pub const fn next_deadline(&self) -> u64 {
        self.next_deadline
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Won { score: usize },
    Ended { score: usize },
    Quit { score: usize },
}

impl Outcome {
    pub const fn score(self) -> usize {
        match self {
            Self::Won { score } | Self::Ended { score } | Self::Quit { score } => score,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Won { .. } => "won",
            Self::Ended { .. } => "ended",
            Self::Quit { .. } => "quit",
        }
    }
}

/// One run of the game: owns the simulation, the cadence gate and the spawn generator.
pub struct Session<const CAP: usize> {
    game: Game<CAP>,
    gate: StepGate,
    lcg: SpawnLcg,
}

impl<const CAP: usize> Session<CAP> {
    pub fn start<T, C>(config: &SnakeConfig, clock: &mut T, canvas: &mut C) -> Result<Self, ConfigError>
    where
        T: TickSource + EntropySource,
        C: Canvas,
    {
        config.validate::<CAP>()?;

        let mut lcg = SpawnLcg::new(clock.jitter());
        canvas.clear_full_screen();
        draw_walls(canvas, &config.arena);

        let now = clock.poll_ticks();
        let game = Game::new(config, &mut lcg.with_entropy(clock))?;
        let session = Self {
            game,
            gate: StepGate::new(now, config.cadence),
            lcg,
        };
        session.draw_frame(canvas);

        log::info!(
            "snake: start cadence={} length={} capacity={} target=({}, {}) tick={}",
            config.cadence,
            session.game.length(),
            CAP,
            session.game.target().x,
            session.game.target().y,
            now
        );
        Ok(session)
    }

    /// One pass of the busy loop. Returns the outcome once the run is over.
    pub fn iterate<T, K, C>(&mut self, clock: &mut T, keys: &mut K, canvas: &mut C) -> Option<Outcome>
    where
        T: TickSource + EntropySource,
        K: KeySource,
        C: Canvas,
    {
        let now = clock.poll_ticks();

        match keys.poll_key() {
            Some(Key::Steer(direction)) => self.game.steer(direction),
            Some(Key::Quit) => {
                log::info!("snake: quit requested tick={now}");
                return Some(Outcome::Quit {
                    score: self.game.length(),
                });
            }
            None => {}
        }

        canvas.draw_number(self.game.length() as u32, SCORE_CELL, Style::SCORE);

        if self.game.check_win() {
            return self.outcome();
        }

        if self.gate.take(now) {
            let event = self.game.step(&mut self.lcg.with_entropy(clock));
            self.draw_frame(canvas);
            log::debug!(
                "snake: step={} tick={} event={} heading={} length={}",
                self.game.steps(),
                now,
                event.as_str(),
                self.game.direction().as_str(),
                self.game.length()
            );
            if event == StepEvent::Ate {
                log::info!(
                    "snake: ate length={} next_target=({}, {})",
                    self.game.length(),
                    self.game.target().x,
                    self.game.target().y
                );
            }
        }

        self.outcome()
    }

    pub const fn game(&self) -> &Game<CAP> {
        &self.game
    }

    pub const fn gate(&self) -> &StepGate {
        &self.gate
    }

    fn outcome(&self) -> Option<Outcome> {
        let score = self.game.length();
        match self.game.phase() {
            Phase::Running => None,
            Phase::Ended => Some(Outcome::Ended { score }),
            Phase::Won => Some(Outcome::Won { score }),
        }
    }

    fn draw_frame<C: Canvas>(&self, canvas: &mut C) {
        let (first, last) = self.game.arena().interior_corners();
        canvas.clear_region(first, last);
        canvas.draw_glyph(TARGET_GLYPH, self.game.target(), Style::TARGET);
        for cell in self.game.body().iter() {
            canvas.draw_glyph(BODY_GLYPH, cell, Style::BODY);
        }
    }
}

/// Plays a full run, spinning until the game is won, lost or quit.
pub fn run<const CAP: usize, T, K, C>(
    config: &SnakeConfig,
    clock: &mut T,
    keys: &mut K,
    canvas: &mut C,
) -> Result<Outcome, ConfigError>
where
    T: TickSource + EntropySource,
    K: KeySource,
    C: Canvas,
{
    let mut session = Session::<CAP>::start(config, clock, canvas)?;
    loop {
        if let Some(outcome) = session.iterate(clock, keys, canvas) {
            log::info!(
                "snake: outcome={} score={} steps={}",
                outcome.as_str(),
                outcome.score(),
                session.game().steps()
            );
            return Ok(outcome);
        }
        core::hint::spin_loop();
    }
}

pub fn draw_walls<C: Canvas>(canvas: &mut C, arena: &Arena) {
    for y in arena.top..=arena.bottom {
        canvas.draw_glyph(WALL_GLYPH, Cell::new(arena.left, y), Style::WALL);
        canvas.draw_glyph(WALL_GLYPH, Cell::new(arena.right, y), Style::WALL);
    }
    for x in arena.left..=arena.right {
        canvas.draw_glyph(WALL_GLYPH, Cell::new(x, arena.top), Style::WALL);
        canvas.draw_glyph(WALL_GLYPH, Cell::new(x, arena.bottom), Style::WALL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CAPACITY;

    /// Advances a fixed number of ticks on every poll.
    struct Stepper {
        now: u64,
        per_poll: u64,
        noise: u16,
    }

    impl TickSource for Stepper {
        fn poll_ticks(&mut self) -> u64 {
            self.now += self.per_poll;
            self.now
        }
    }

    impl EntropySource for Stepper {
        fn jitter(&mut self) -> u16 {
            self.noise = self.noise.wrapping_add(0x3b1);
            self.noise
        }
    }

    struct Scripted<'a> {
        keys: &'a [Option<Key>],
        next: usize,
    }

    impl KeySource for Scripted<'_> {
        type Raw = Key;

        fn read_raw_input(&mut self) -> Option<Key> {
            let key = self.keys.get(self.next).copied().flatten();
            self.next += 1;
            key
        }

        fn translate(&mut self, raw: Key) -> Option<Key> {
            Some(raw)
        }
    }

    #[derive(Default)]
    struct Recorder {
        glyphs: usize,
        clears: usize,
        full_clears: usize,
        last_number: Option<u32>,
    }

    impl Canvas for Recorder {
        fn draw_glyph(&mut self, _glyph: u8, _at: Cell, _style: Style) {
            self.glyphs += 1;
        }

        fn clear_region(&mut self, _from: Cell, _to: Cell) {
            self.clears += 1;
        }

        fn clear_full_screen(&mut self) {
            self.full_clears += 1;
        }

        fn draw_number(&mut self, value: u32, _at: Cell, _style: Style) {
            self.last_number = Some(value);
        }
    }

    fn stepper(per_poll: u64) -> Stepper {
        Stepper {
            now: 100,
            per_poll,
            noise: 0,
        }
    }

    #[test]
    fn gate_opens_once_per_cadence() {
        let mut gate = StepGate::new(10, 4);
        assert!(!gate.take(11));
        assert!(!gate.take(13));
        assert!(gate.take(14));
        assert!(!gate.take(14));
        assert_eq!(gate.next_deadline(), 18);
    }

    #[test]
    fn late_polls_are_paid_back_one_step_per_take() {
        let mut gate = StepGate::new(0, 4);
        // A late poll is paid back one step per iteration at fixed increments, never skipped.
        assert!(gate.take(16));
        assert_eq!(gate.next_deadline(), 8);
        assert!(gate.take(16));
        assert!(gate.take(16));
        assert!(gate.take(16));
        assert_eq!(gate.next_deadline(), 20);
        assert!(!gate.take(16));
    }

    #[test]
    fn start_draws_walls_and_first_frame() {
        let config = SnakeConfig::default();
        let mut clock = stepper(0);
        let mut canvas = Recorder::default();
        let session = Session::<DEFAULT_CAPACITY>::start(&config, &mut clock, &mut canvas).unwrap();

        // 25 rows x 2 side walls + 51 columns x 2 edges, then target + 8 body cells.
        assert_eq!(canvas.glyphs, 25 * 2 + 51 * 2 + 1 + 8);
        assert_eq!(canvas.full_clears, 1);
        assert_eq!(canvas.clears, 1);
        assert_eq!(session.gate().next_deadline(), 104);
    }

    #[test]
    fn one_step_per_cadence_interval() {
        let config = SnakeConfig {
            cadence: 3,
            ..SnakeConfig::default()
        };
        let mut clock = stepper(3);
        let mut canvas = Recorder::default();
        let mut keys = Scripted {
            keys: &[],
            next: 0,
        };
        let mut session = Session::<DEFAULT_CAPACITY>::start(&config, &mut clock, &mut canvas).unwrap();

        for call in 1..=10u64 {
            assert_eq!(session.iterate(&mut clock, &mut keys, &mut canvas), None);
            assert_eq!(session.game().steps(), call);
        }
    }

    #[test]
    fn fast_polling_collapses_to_one_step() {
        let config = SnakeConfig::default();
        let mut clock = stepper(0);
        let mut canvas = Recorder::default();
        let mut keys = Scripted {
            keys: &[],
            next: 0,
        };
        let mut session = Session::<DEFAULT_CAPACITY>::start(&config, &mut clock, &mut canvas).unwrap();

        for _ in 0..50 {
            session.iterate(&mut clock, &mut keys, &mut canvas);
        }
        assert_eq!(session.game().steps(), 0);

        clock.per_poll = 4;
        session.iterate(&mut clock, &mut keys, &mut canvas);
        clock.per_poll = 0;
        for _ in 0..50 {
            session.iterate(&mut clock, &mut keys, &mut canvas);
        }
        assert_eq!(session.game().steps(), 1);
        assert_eq!(canvas.last_number, Some(session.game().length() as u32));
    }

    #[test]
    fn last_key_before_the_deadline_wins() {
        let config = SnakeConfig::default();
        let mut clock = stepper(1);
        let mut canvas = Recorder::default();
        let script = [
            Some(Key::Steer(Direction::Up)),
            Some(Key::Steer(Direction::Left)),
            Some(Key::Steer(Direction::Down)),
            None,
        ];
        let mut keys = Scripted {
            keys: &script,
            next: 0,
        };
        let mut session = Session::<DEFAULT_CAPACITY>::start(&config, &mut clock, &mut canvas).unwrap();
        let head = session.game().body().head().unwrap();

        for _ in 0..4 {
            session.iterate(&mut clock, &mut keys, &mut canvas);
        }
        assert_eq!(session.game().steps(), 1);
        assert_eq!(session.game().direction(), Direction::Down);
        assert_eq!(session.game().body().head(), Some(Cell::new(head.x, head.y + 1)));
    }

    #[test]
    fn quit_key_stops_the_run() {
        let config = SnakeConfig::default();
        let mut clock = stepper(1);
        let mut canvas = Recorder::default();
        let script = [None, Some(Key::Quit)];
        let mut keys = Scripted {
            keys: &script,
            next: 0,
        };
        let outcome = run::<DEFAULT_CAPACITY, _, _, _>(&config, &mut clock, &mut keys, &mut canvas);
        assert_eq!(outcome, Ok(Outcome::Quit { score: 8 }));
    }

    #[test]
    fn heading_right_ends_at_the_wall() {
        let config = SnakeConfig {
            cadence: 1,
            ..SnakeConfig::default()
        };
        let mut clock = stepper(1);
        let mut canvas = Recorder::default();
        let mut keys = Scripted {
            keys: &[],
            next: 0,
        };
        let outcome = run::<DEFAULT_CAPACITY, _, _, _>(&config, &mut clock, &mut keys, &mut canvas)
            .unwrap();
        let Outcome::Ended { score } = outcome else {
            panic!("expected a wall collision, got {outcome:?}");
        };
        // Head starts at x=23 and the right wall is x=65; targets eaten on the way only add length.
        assert!(score >= 8);
        assert_eq!(canvas.last_number, Some(score as u32));
    }

    #[test]
    fn full_capacity_wins_before_any_step() {
        let config = SnakeConfig {
            initial_length: 8,
            ..SnakeConfig::default()
        };
        let mut clock = stepper(10);
        let mut canvas = Recorder::default();
        let mut keys = Scripted {
            keys: &[],
            next: 0,
        };
        let outcome = run::<8, _, _, _>(&config, &mut clock, &mut keys, &mut canvas);
        assert_eq!(outcome, Ok(Outcome::Won { score: 8 }));
    }

    #[test]
    fn invalid_config_is_reported_before_drawing() {
        let config = SnakeConfig {
            cadence: 0,
            ..SnakeConfig::default()
        };
        let mut clock = stepper(1);
        let mut canvas = Recorder::default();
        let mut keys = Scripted {
            keys: &[],
            next: 0,
        };
        let outcome = run::<DEFAULT_CAPACITY, _, _, _>(&config, &mut clock, &mut keys, &mut canvas);
        assert_eq!(outcome, Err(ConfigError::ZeroCadence));
        assert_eq!(canvas.full_clears, 0);
    }

    #[test]
    fn style_nibbles() {
        assert_eq!(Style::WALL.foreground(), 0x0d);
        assert_eq!(Style(0x1e).background(), 0x01);
    }
}
