// crates/laskar-core/src/input.rs: byte-level key mapping shared by the PS/2 and serial key paths.
use crate::game_loop::Key;
use crate::snake::Direction;

pub const ESCAPE: u8 = 0x1b;

/// Game binding for a single ASCII byte. Letters match either case.
pub const fn key_for_byte(byte: u8) -> Option<Key> {
    match byte {
        b'w' | b'W' => Some(Key::Steer(Direction::Up)),
        b'a' | b'A' => Some(Key::Steer(Direction::Left)),
        b's' | b'S' => Some(Key::Steer(Direction::Down)),
        b'd' | b'D' => Some(Key::Steer(Direction::Right)),
        b'q' | b'Q' | ESCAPE => Some(Key::Quit),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum EscapeState {
    #[default]
    Idle,
    Escape,
    Csi,
}

/// Turns a terminal byte stream into keys, folding `ESC [ A..D` arrow sequences.
///
/// A bare escape byte never quits on this path: terminals send it as the first byte of every
/// arrow key, so `q` is the only quit binding over serial.
#[derive(Clone, Copy, Debug, Default)]
pub struct EscapeDecoder {
    state: EscapeState,
}

impl EscapeDecoder {
    pub const fn new() -> Self {
        Self {
            state: EscapeState::Idle,
        }
    }

    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match (self.state, byte) {
            (_, ESCAPE) => {
                self.state = EscapeState::Escape;
                None
            }
            (EscapeState::Idle, _) => key_for_byte(byte),
            (EscapeState::Escape, b'[') => {
                self.state = EscapeState::Csi;
                None
            }
            (EscapeState::Escape, _) => {
                self.state = EscapeState::Idle;
                key_for_byte(byte)
            }
            (EscapeState::Csi, _) => {
                self.state = EscapeState::Idle;
                let direction = match byte {
                    b'A' => Direction::Up,
                    b'B' => Direction::Down,
                    b'C' => Direction::Right,
                    b'D' => Direction::Left,
                    _ => return None,
                };
                Some(Key::Steer(direction))
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == EscapeState::Idle
    }
}
