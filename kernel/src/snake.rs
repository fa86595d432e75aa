// kernel/src/snake.rs: wires the core game loop to the PIT clock, PS/2 + serial keys and the console.
use crate::keyboard::{self, KeyCode};
use crate::{console, serial, time};
use laskar_core::config::{DEFAULT_CAPACITY, SnakeConfig};
use laskar_core::game_loop::{self, Canvas, Key, KeySource, Outcome, Style};
use laskar_core::input::{EscapeDecoder, key_for_byte};
use laskar_core::snake::{Cell, Direction};

const CADENCE_OVERRIDE: Option<&str> = option_env!("LASKAR_SNAKE_CADENCE");
const INITIAL_LENGTH_OVERRIDE: Option<&str> = option_env!("LASKAR_SNAKE_INITIAL_LENGTH");

// Wide enough for the largest score so shorter values overwrite stale digits.
const SCORE_WIDTH: usize = 5;

pub enum RawInput {
    Keyboard(KeyCode),
    Serial(u8),
}

struct KernelKeys {
    serial: EscapeDecoder,
}

impl KeySource for KernelKeys {
    type Raw = RawInput;

    fn read_raw_input(&mut self) -> Option<RawInput> {
        while let Some(event) = keyboard::poll_event() {
            if event.pressed {
                return Some(RawInput::Keyboard(event.code));
            }
        }
        serial::try_read_byte().map(RawInput::Serial)
    }

    fn translate(&mut self, raw: RawInput) -> Option<Key> {
        match raw {
            RawInput::Keyboard(KeyCode::ArrowUp) => Some(Key::Steer(Direction::Up)),
            RawInput::Keyboard(KeyCode::ArrowDown) => Some(Key::Steer(Direction::Down)),
            RawInput::Keyboard(KeyCode::ArrowLeft) => Some(Key::Steer(Direction::Left)),
            RawInput::Keyboard(KeyCode::ArrowRight) => Some(Key::Steer(Direction::Right)),
            RawInput::Keyboard(KeyCode::Byte(byte)) => key_for_byte(byte),
            RawInput::Serial(byte) => self.serial.feed(byte),
        }
    }
}

struct ScreenCanvas;

impl Canvas for ScreenCanvas {
    fn draw_glyph(&mut self, glyph: u8, at: Cell, style: Style) {
        console::put_glyph(at, glyph, style);
    }

    fn clear_region(&mut self, from: Cell, to: Cell) {
        console::clear_region(from, to);
    }

    fn clear_full_screen(&mut self) {
        console::clear();
    }

    fn draw_number(&mut self, value: u32, at: Cell, style: Style) {
        let mut digits = [b' '; SCORE_WIDTH];
        let mut rest = value;
        let mut index = SCORE_WIDTH;
        loop {
            index -= 1;
            digits[index] = b'0' + (rest % 10) as u8;
            rest /= 10;
            if rest == 0 || index == 0 {
                break;
            }
        }
        // Left-aligned: shift the digits to the start and pad with blanks.
        digits.rotate_left(index);
        for (offset, glyph) in digits.iter().enumerate() {
            let cell = Cell::new(at.x.saturating_add(offset as u8), at.y);
            console::put_glyph(cell, *glyph, style);
        }
    }
}

/// Plays one game on the console and returns to the shell when it ends.
pub fn run() {
    let config = configured();
    let mut keys = KernelKeys {
        serial: EscapeDecoder::new(),
    };
    let mut canvas = ScreenCanvas;

    let result = time::with_clock(|clock| {
        game_loop::run::<DEFAULT_CAPACITY, _, _, _>(&config, clock, &mut keys, &mut canvas)
    });

    console::clear();
    match result {
        None => console::write_line("snake: clock not initialised"),
        Some(Err(error)) => console::write_fmt(format_args!("snake: {error}\n")),
        Some(Ok(Outcome::Won { score })) => console::write_fmt(format_args!(
            "You win! You've reached the max score of {score}!\n"
        )),
        Some(Ok(Outcome::Ended { score } | Outcome::Quit { score })) => {
            console::write_fmt(format_args!("Your score is: {score}\n"))
        }
    }
}

/// Defaults with any build-time overrides applied. Overrides that fail to parse or validate
/// are reported and dropped.
fn configured() -> SnakeConfig {
    let defaults = SnakeConfig::default();
    let mut config = defaults;

    if let Some(raw) = CADENCE_OVERRIDE {
        match raw.trim().parse::<u64>() {
            Ok(cadence) => config.cadence = cadence,
            Err(_) => log::warn!("snake: ignoring LASKAR_SNAKE_CADENCE={raw}"),
        }
    }
    if let Some(raw) = INITIAL_LENGTH_OVERRIDE {
        match raw.trim().parse::<usize>() {
            Ok(length) => config.initial_length = length,
            Err(_) => log::warn!("snake: ignoring LASKAR_SNAKE_INITIAL_LENGTH={raw}"),
        }
    }

    match config.validate::<DEFAULT_CAPACITY>() {
        Ok(()) => config,
        Err(error) => {
            log::warn!("snake: overrides rejected ({error}); using defaults");
            defaults
        }
    }
}
