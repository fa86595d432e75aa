// crates/laskar-core/src/snake.rs: snake simulation state advanced one discrete step at a time.
use crate::config::{ConfigError, SnakeConfig};
use rand::{Rng, RngCore};

/// Screen cell, column `x` and row `y`. Rows grow downward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: u8,
    pub y: u8,
}

impl Cell {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Neighbour one unit away, or `None` when that leaves the `u8` coordinate space.
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.delta();
        Some(Self {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub const fn delta(self) -> (i8, i8) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Rectangle of wall coordinates (inclusive). Playable cells lie strictly inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arena {
    pub left: u8,
    pub top: u8,
    pub right: u8,
    pub bottom: u8,
}

impl Arena {
    pub const fn new(left: u8, top: u8, right: u8, bottom: u8) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Arena of `width` x `height` centred on a `cols` x `rows` screen.
    pub const fn centered(cols: u8, rows: u8, width: u8, height: u8) -> Self {
        let x_middle = cols / 2;
        let y_middle = rows / 2;
        Self {
            left: x_middle.saturating_sub(width / 2),
            top: y_middle.saturating_sub(height / 2),
            right: x_middle.saturating_add(width / 2),
            bottom: y_middle.saturating_add(height / 2),
        }
    }

    pub const fn has_interior(&self) -> bool {
        self.right > self.left.saturating_add(1) && self.bottom > self.top.saturating_add(1)
    }

    pub const fn is_interior(&self, cell: Cell) -> bool {
        cell.x > self.left && cell.x < self.right && cell.y > self.top && cell.y < self.bottom
    }

    pub const fn interior_width(&self) -> usize {
        (self.right as usize).saturating_sub(self.left as usize + 1)
    }

    pub const fn interior_height(&self) -> usize {
        (self.bottom as usize).saturating_sub(self.top as usize + 1)
    }

    pub const fn interior_area(&self) -> usize {
        self.interior_width() * self.interior_height()
    }

    /// First and last playable cell. Only meaningful when `has_interior` holds.
    pub const fn interior_corners(&self) -> (Cell, Cell) {
        (
            Cell::new(self.left.saturating_add(1), self.top.saturating_add(1)),
            Cell::new(self.right.saturating_sub(1), self.bottom.saturating_sub(1)),
        )
    }

    pub const fn middle_row(&self) -> u8 {
        self.top + self.bottom.saturating_sub(self.top) / 2
    }
}

/// Head-first ring buffer of body cells with a hard capacity.
#[derive(Clone, Debug)]
pub struct Body<const CAP: usize> {
    cells: [Cell; CAP],
    head: usize,
    len: usize,
}

impl<const CAP: usize> Default for Body<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> Body<CAP> {
    pub const fn new() -> Self {
        Self {
            cells: [Cell::new(0, 0); CAP],
            head: 0,
            len: 0,
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn is_full(&self) -> bool {
        self.len == CAP
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }

    pub fn head(&self) -> Option<Cell> {
        self.get(0)
    }

    /// Cell `index` counted from the head.
    pub fn get(&self, index: usize) -> Option<Cell> {
        if index >= self.len {
            return None;
        }
        Some(self.cells[self.slot(index)])
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.len).map(move |index| self.cells[self.slot(index)])
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.iter().any(|occupied| occupied == cell)
    }

    pub fn push_front(&mut self, cell: Cell) {
        assert!(self.len < CAP, "snake body capacity {} exceeded", CAP);
        self.head = (self.head + CAP - 1) % CAP;
        self.cells[self.head] = cell;
        self.len += 1;
    }

    pub fn push_back(&mut self, cell: Cell) {
        assert!(self.len < CAP, "snake body capacity {} exceeded", CAP);
        let slot = self.slot(self.len);
        self.cells[slot] = cell;
        self.len += 1;
    }

    pub fn pop_back(&mut self) -> Option<Cell> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.cells[self.slot(self.len)])
    }

    fn slot(&self, index: usize) -> usize {
        (self.head + index) % CAP
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Running,
    Ended,
    Won,
}

impl Phase {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// What a single `Game::step` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepEvent {
    Moved,
    Ate,
    HitWall,
    HitSelf,
    /// The game was already over (or full); nothing changed.
    Halted,
}

impl StepEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Moved => "moved",
            Self::Ate => "ate",
            Self::HitWall => "hit-wall",
            Self::HitSelf => "hit-self",
            Self::Halted => "halted",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Game<const CAP: usize> {
    arena: Arena,
    body: Body<CAP>,
    direction: Direction,
    pending: Direction,
    target: Cell,
    phase: Phase,
    steps: u64,
}

impl<const CAP: usize> Game<CAP> {
    /// Straight body on the middle row heading right, target placed at random.
    pub fn new<R: RngCore>(config: &SnakeConfig, rng: &mut R) -> Result<Self, ConfigError> {
        config.validate::<CAP>()?;

        let arena = config.arena;
        let row = arena.middle_row();
        let mut body = Body::new();
        // Tail first so the head ends up rightmost.
        for offset in 0..config.initial_length {
            let x = arena.left as usize + 1 + offset;
            body.push_front(Cell::new(x as u8, row));
        }

        let mut game = Self {
            arena,
            body,
            direction: Direction::Right,
            pending: Direction::Right,
            target: Cell::default(),
            phase: Phase::Running,
            steps: 0,
        };
        game.target = game.spawn_target(rng);
        Ok(game)
    }

    /// Game in an explicit position. `cells` is head-first.
    pub fn with_body(
        arena: Arena,
        cells: &[Cell],
        direction: Direction,
        target: Cell,
    ) -> Result<Self, ConfigError> {
        if !arena.has_interior() {
            return Err(ConfigError::DegenerateArena);
        }
        if cells.is_empty() {
            return Err(ConfigError::EmptyBody);
        }
        let area = arena.interior_area();
        // Spawning needs a free cell even with a full body.
        if CAP >= area {
            return Err(ConfigError::CapacityFillsArena {
                capacity: CAP,
                area,
            });
        }
        if cells.len() > CAP {
            return Err(ConfigError::InitialLengthExceedsCapacity {
                length: cells.len(),
                capacity: CAP,
            });
        }
        if let Some(outside) = cells
            .iter()
            .copied()
            .chain(core::iter::once(target))
            .find(|cell| !arena.is_interior(*cell))
        {
            return Err(ConfigError::CellOutsideArena(outside));
        }
        if cells.contains(&target) {
            return Err(ConfigError::TargetOccupied(target));
        }
        for (index, cell) in cells.iter().enumerate() {
            if cells[index + 1..].contains(cell) {
                return Err(ConfigError::OverlappingBody(*cell));
            }
        }

        let mut body = Body::new();
        for cell in cells {
            body.push_back(*cell);
        }
        Ok(Self {
            arena,
            body,
            direction,
            pending: direction,
            target,
            phase: Phase::Running,
            steps: 0,
        })
    }

    /// Records the requested heading for the next step. Last request wins.
    pub fn steer(&mut self, direction: Direction) {
        if self.phase == Phase::Running {
            self.pending = direction;
        }
    }

    /// Moves to `Won` once the body fills its capacity.
    pub fn check_win(&mut self) -> bool {
        if self.phase == Phase::Running && self.body.is_full() {
            self.phase = Phase::Won;
        }
        self.phase == Phase::Won
    }

    pub fn step<R: RngCore>(&mut self, rng: &mut R) -> StepEvent {
        if self.phase != Phase::Running || self.check_win() {
            return StepEvent::Halted;
        }
        let Some(old_head) = self.body.head() else {
            return StepEvent::Halted;
        };

        // A 180 degree turn would run the head into the neck.
        if self.pending == self.direction.opposite() {
            self.pending = self.direction;
        }
        self.direction = self.pending;
        self.steps += 1;

        let vacated = self.body.pop_back();
        let moved = old_head.step(self.direction);
        let new_head = moved.unwrap_or(old_head);
        self.body.push_front(new_head);

        if moved.is_none() || !self.arena.is_interior(new_head) {
            self.phase = Phase::Ended;
            return StepEvent::HitWall;
        }
        if self.body.iter().skip(1).any(|cell| cell == new_head) {
            self.phase = Phase::Ended;
            return StepEvent::HitSelf;
        }
        if new_head == self.target {
            if let Some(tail) = vacated {
                self.body.push_back(tail);
            }
            self.target = self.spawn_target(rng);
            return StepEvent::Ate;
        }
        StepEvent::Moved
    }

    fn spawn_target<R: RngCore>(&self, rng: &mut R) -> Cell {
        let (first, last) = self.arena.interior_corners();
        loop {
            let candidate = Cell::new(
                rng.random_range(first.x..=last.x),
                rng.random_range(first.y..=last.y),
            );
            if !self.body.contains(candidate) {
                return candidate;
            }
        }
    }

    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    pub const fn body(&self) -> &Body<CAP> {
        &self.body
    }

    pub const fn length(&self) -> usize {
        self.body.len()
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    pub const fn pending(&self) -> Direction {
        self.pending
    }

    pub const fn target(&self) -> Cell {
        self.target
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub const fn steps(&self) -> u64 {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CAPACITY;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn arena() -> Arena {
        Arena::new(0, 0, 20, 20)
    }

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(0x1a5c_a12)
    }

    fn cells<const CAP: usize>(game: &Game<CAP>, out: &mut [Cell]) -> usize {
        let mut len = 0;
        for (slot, cell) in out.iter_mut().zip(game.body().iter()) {
            *slot = cell;
            len += 1;
        }
        len
    }

    #[test]
    fn body_ring_wraps_around_its_storage() {
        let mut body: Body<3> = Body::new();
        body.push_back(Cell::new(1, 1));
        body.push_back(Cell::new(2, 1));
        assert_eq!(body.pop_back(), Some(Cell::new(2, 1)));
        body.push_front(Cell::new(0, 1));
        body.push_front(Cell::new(0, 0));
        assert!(body.is_full());
        assert_eq!(body.get(0), Some(Cell::new(0, 0)));
        assert_eq!(body.get(1), Some(Cell::new(0, 1)));
        assert_eq!(body.get(2), Some(Cell::new(1, 1)));
        assert_eq!(body.get(3), None);
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn overfilling_the_body_is_fatal() {
        let mut body: Body<1> = Body::new();
        body.push_back(Cell::new(1, 1));
        body.push_front(Cell::new(2, 1));
    }

    #[test]
    fn new_game_lays_body_on_the_middle_row() {
        let config = SnakeConfig::default();
        let game: Game<DEFAULT_CAPACITY> = Game::new(&config, &mut rng()).unwrap();
        assert_eq!(game.length(), 8);
        assert_eq!(game.body().head(), Some(Cell::new(23, 12)));
        assert_eq!(game.body().get(7), Some(Cell::new(16, 12)));
        assert!(game.body().iter().all(|cell| config.arena.is_interior(cell)));
        assert!(config.arena.is_interior(game.target()));
        assert!(!game.body().contains(game.target()));
        assert_eq!(game.direction(), Direction::Right);
        assert_eq!(game.pending(), Direction::Right);
        assert_eq!(game.phase(), Phase::Running);
    }

    #[test]
    fn eating_grows_and_respawns_off_body() {
        let body = [Cell::new(10, 10), Cell::new(9, 10), Cell::new(8, 10)];
        let mut game: Game<16> =
            Game::with_body(arena(), &body, Direction::Right, Cell::new(11, 10)).unwrap();

        assert_eq!(game.step(&mut rng()), StepEvent::Ate);

        let mut out = [Cell::default(); 8];
        let len = cells(&game, &mut out);
        assert_eq!(
            &out[..len],
            &[
                Cell::new(11, 10),
                Cell::new(10, 10),
                Cell::new(9, 10),
                Cell::new(8, 10)
            ]
        );
        assert_eq!(game.length(), 4);
        assert!(!game.body().contains(game.target()));
        assert!(game.arena().is_interior(game.target()));
        assert_eq!(game.phase(), Phase::Running);
    }

    #[test]
    fn reversal_is_ignored_for_every_opposite_pair() {
        for heading in Direction::ALL {
            let head = Cell::new(10, 10);
            let neck = head.step(heading.opposite()).unwrap();
            let mut game: Game<8> =
                Game::with_body(arena(), &[head, neck], heading, Cell::new(1, 1)).unwrap();
            game.steer(heading.opposite());
            assert_eq!(game.step(&mut rng()), StepEvent::Moved);
            assert_eq!(game.direction(), heading);
            assert_eq!(game.body().head(), head.step(heading));
        }
    }

    #[test]
    fn guard_uses_the_last_applied_direction() {
        let body = [Cell::new(10, 10), Cell::new(9, 10), Cell::new(8, 10)];
        let mut game: Game<8> =
            Game::with_body(arena(), &body, Direction::Right, Cell::new(1, 1)).unwrap();
        game.steer(Direction::Up);
        game.step(&mut rng());
        // Heading is now up, so left is a legal turn.
        game.steer(Direction::Left);
        assert_eq!(game.step(&mut rng()), StepEvent::Moved);
        assert_eq!(game.direction(), Direction::Left);
        assert_eq!(game.body().head(), Some(Cell::new(9, 9)));
    }

    #[test]
    fn running_into_the_wall_ends_the_game() {
        let arena = Arena::new(0, 0, 12, 20);
        let body = [Cell::new(11, 5), Cell::new(10, 5)];
        let mut game: Game<8> =
            Game::with_body(arena, &body, Direction::Right, Cell::new(1, 1)).unwrap();
        assert_eq!(game.step(&mut rng()), StepEvent::HitWall);
        assert_eq!(game.phase(), Phase::Ended);
        assert_eq!(game.length(), 2);

        // Terminal state is frozen.
        let head = game.body().head();
        game.steer(Direction::Up);
        assert_eq!(game.step(&mut rng()), StepEvent::Halted);
        assert_eq!(game.body().head(), head);
        assert_eq!(game.pending(), Direction::Right);
    }

    #[test]
    fn biting_the_body_ends_the_game() {
        // Head at (5,5) curling back into its own tail segment.
        let body = [
            Cell::new(5, 5),
            Cell::new(6, 5),
            Cell::new(6, 6),
            Cell::new(5, 6),
            Cell::new(4, 6),
        ];
        let mut game: Game<8> =
            Game::with_body(arena(), &body, Direction::Left, Cell::new(1, 1)).unwrap();
        game.steer(Direction::Down);
        assert_eq!(game.step(&mut rng()), StepEvent::HitSelf);
        assert_eq!(game.phase(), Phase::Ended);
    }

    #[test]
    fn moving_into_the_vacated_tail_is_safe() {
        let body = [
            Cell::new(5, 5),
            Cell::new(6, 5),
            Cell::new(6, 6),
            Cell::new(5, 6),
        ];
        let mut game: Game<8> =
            Game::with_body(arena(), &body, Direction::Left, Cell::new(1, 1)).unwrap();
        game.steer(Direction::Down);
        assert_eq!(game.step(&mut rng()), StepEvent::Moved);
        assert_eq!(game.body().head(), Some(Cell::new(5, 6)));
    }

    #[test]
    fn full_body_wins_without_moving() {
        let body = [Cell::new(11, 5), Cell::new(10, 5)];
        let mut game: Game<2> =
            Game::with_body(Arena::new(0, 0, 12, 20), &body, Direction::Right, Cell::new(1, 1))
                .unwrap();
        // The head is next to the wall, but winning is decided first.
        assert_eq!(game.step(&mut rng()), StepEvent::Halted);
        assert_eq!(game.phase(), Phase::Won);
        assert_eq!(game.body().head(), Some(Cell::new(11, 5)));
        assert_eq!(game.steps(), 0);
    }

    #[test]
    fn with_body_rejects_bad_positions() {
        let result: Result<Game<4>, _> =
            Game::with_body(arena(), &[], Direction::Right, Cell::new(1, 1));
        assert_eq!(result.err(), Some(ConfigError::EmptyBody));

        let result: Result<Game<4>, _> =
            Game::with_body(arena(), &[Cell::new(0, 3)], Direction::Right, Cell::new(1, 1));
        assert_eq!(result.err(), Some(ConfigError::CellOutsideArena(Cell::new(0, 3))));

        let result: Result<Game<4>, _> =
            Game::with_body(arena(), &[Cell::new(2, 3)], Direction::Right, Cell::new(2, 3));
        assert_eq!(result.err(), Some(ConfigError::TargetOccupied(Cell::new(2, 3))));
    }

    #[test]
    fn with_body_rejects_capacity_that_fills_the_arena() {
        // 3x2 interior: a full body of eight could never leave room for the target.
        let small = Arena::new(0, 0, 4, 3);
        let body = [
            Cell::new(1, 1),
            Cell::new(2, 1),
            Cell::new(3, 1),
            Cell::new(3, 2),
            Cell::new(2, 2),
        ];
        let result: Result<Game<8>, _> =
            Game::with_body(small, &body, Direction::Left, Cell::new(1, 2));
        assert_eq!(
            result.err(),
            Some(ConfigError::CapacityFillsArena {
                capacity: 8,
                area: 6
            })
        );

        let result: Result<Game<5>, _> =
            Game::with_body(small, &body, Direction::Left, Cell::new(1, 2));
        assert!(result.is_ok());
    }

    #[test]
    fn with_body_rejects_repeated_cells() {
        let body = [Cell::new(5, 5), Cell::new(5, 5)];
        let result: Result<Game<4>, _> =
            Game::with_body(arena(), &body, Direction::Right, Cell::new(1, 1));
        assert_eq!(result.err(), Some(ConfigError::OverlappingBody(Cell::new(5, 5))));
    }

    #[test]
    fn cell_steps_stay_in_coordinate_space() {
        assert_eq!(Cell::new(0, 0).step(Direction::Left), None);
        assert_eq!(Cell::new(0, 0).step(Direction::Up), None);
        assert_eq!(Cell::new(255, 3).step(Direction::Right), None);
        assert_eq!(Cell::new(3, 3).step(Direction::Down), Some(Cell::new(3, 4)));
    }
}
