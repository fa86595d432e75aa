// crates/laskar-core/src/config.rs: game parameters with the stock 80x25 layout and their validation.
use crate::snake::{Arena, Cell};
use core::fmt;

pub const SCREEN_COLS: u8 = 80;
pub const SCREEN_ROWS: u8 = 25;
pub const ARENA_WIDTH: u8 = 50;
pub const ARENA_HEIGHT: u8 = 25;
pub const DEFAULT_CADENCE: u64 = 4;
pub const DEFAULT_INITIAL_LENGTH: usize = 8;
pub const DEFAULT_CAPACITY: usize = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnakeConfig {
    pub arena: Arena,
    /// Ticks between two simulation steps.
    pub cadence: u64,
    pub initial_length: usize,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            arena: Arena::centered(SCREEN_COLS, SCREEN_ROWS, ARENA_WIDTH, ARENA_HEIGHT),
            cadence: DEFAULT_CADENCE,
            initial_length: DEFAULT_INITIAL_LENGTH,
        }
    }
}

impl SnakeConfig {
    pub fn validate<const CAP: usize>(&self) -> Result<(), ConfigError> {
        if !self.arena.has_interior() {
            return Err(ConfigError::DegenerateArena);
        }
        if self.cadence == 0 {
            return Err(ConfigError::ZeroCadence);
        }
        if self.initial_length == 0 {
            return Err(ConfigError::ZeroInitialLength);
        }
        if self.initial_length > CAP {
            return Err(ConfigError::InitialLengthExceedsCapacity {
                length: self.initial_length,
                capacity: CAP,
            });
        }
        let width = self.arena.interior_width();
        if self.initial_length > width {
            return Err(ConfigError::InitialLengthExceedsArena {
                length: self.initial_length,
                width,
            });
        }
        // A full board would make target placement spin forever.
        let area = self.arena.interior_area();
        if CAP >= area {
            return Err(ConfigError::CapacityFillsArena {
                capacity: CAP,
                area,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    DegenerateArena,
    ZeroCadence,
    ZeroInitialLength,
    InitialLengthExceedsCapacity { length: usize, capacity: usize },
    InitialLengthExceedsArena { length: usize, width: usize },
    CapacityFillsArena { capacity: usize, area: usize },
    EmptyBody,
    CellOutsideArena(Cell),
    TargetOccupied(Cell),
    OverlappingBody(Cell),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateArena => write!(f, "arena has no interior cells"),
            Self::ZeroCadence => write!(f, "cadence must be at least one tick"),
            Self::ZeroInitialLength => write!(f, "initial length must be at least one cell"),
            Self::InitialLengthExceedsCapacity { length, capacity } => {
                write!(f, "initial length {length} exceeds capacity {capacity}")
            }
            Self::InitialLengthExceedsArena { length, width } => {
                write!(f, "initial length {length} does not fit a {width}-cell row")
            }
            Self::CapacityFillsArena { capacity, area } => {
                write!(f, "capacity {capacity} leaves no free cell in a {area}-cell arena")
            }
            Self::EmptyBody => write!(f, "body needs at least one cell"),
            Self::CellOutsideArena(cell) => {
                write!(f, "cell ({}, {}) is outside the play area", cell.x, cell.y)
            }
            Self::TargetOccupied(cell) => {
                write!(f, "target ({}, {}) overlaps the body", cell.x, cell.y)
            }
            Self::OverlappingBody(cell) => {
                write!(f, "body repeats cell ({}, {})", cell.x, cell.y)
            }
        }
    }
}
