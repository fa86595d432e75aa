// kernel/src/keyboard.rs: polled PS/2 controller with set-1 scancode decoding into key events.
use core::cell::UnsafeCell;
use x86_64::instructions::port::{PortReadOnly, PortWriteOnly};

const PS2_DATA: u16 = 0x60;
const PS2_STATUS: u16 = 0x64;
const PS2_COMMAND: u16 = 0x64;

const STATUS_OUTPUT_FULL: u8 = 0x01;
const STATUS_AUX_DATA: u8 = 0x20;
const STATUS_INPUT_FULL: u8 = 0x02;
const COMMAND_ENABLE_FIRST_PORT: u8 = 0xAE;

const EXTENDED_PREFIX: u8 = 0xE0;
const RELEASE_BIT: u8 = 0x80;
const LEFT_SHIFT: u8 = 0x2A;
const RIGHT_SHIFT: u8 = 0x36;

const EVENT_QUEUE_CAPACITY: usize = 64;
// Upper bound on bytes drained per poll so a stuck controller cannot wedge the main loop.
const MAX_BYTES_PER_POLL: usize = 16;

// Set-1 make codes 0x00..=0x39, unshifted and shifted. Zero means "no character".
const SET1_PLAIN: &[u8; 58] =
    b"\0\x1b1234567890-=\x08\tqwertyuiop[]\n\0asdfghjkl;'`\0\\zxcvbnm,./\0*\0 ";
const SET1_SHIFTED: &[u8; 58] =
    b"\0\x1b!@#$%^&*()_+\x08\tQWERTYUIOP{}\n\0ASDFGHJKL:\"~\0|ZXCVBNM<>?\0*\0 ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCode {
    Byte(u8),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub pressed: bool,
}

#[derive(Clone, Copy)]
pub struct KeyboardInitReport {
    pub flushed_bytes: usize,
    pub queue_capacity: usize,
}

struct KeyboardState {
    shift: bool,
    extended: bool,
    events: [Option<KeyEvent>; EVENT_QUEUE_CAPACITY],
    head: usize,
    tail: usize,
    dropped: u64,
}

impl KeyboardState {
    const fn new() -> Self {
        Self {
            shift: false,
            extended: false,
            events: [None; EVENT_QUEUE_CAPACITY],
            head: 0,
            tail: 0,
            dropped: 0,
        }
    }

    fn handle_scancode(&mut self, scancode: u8) {
        if scancode == EXTENDED_PREFIX {
            self.extended = true;
            return;
        }

        let extended = core::mem::take(&mut self.extended);
        let pressed = scancode & RELEASE_BIT == 0;
        let code = scancode & !RELEASE_BIT;

        if !extended && (code == LEFT_SHIFT || code == RIGHT_SHIFT) {
            self.shift = pressed;
            return;
        }

        if let Some(code) = decode(code, extended, self.shift) {
            self.push(KeyEvent { code, pressed });
        }
    }

    fn push(&mut self, event: KeyEvent) {
        let next_head = (self.head + 1) % EVENT_QUEUE_CAPACITY;
        if next_head == self.tail {
            self.dropped = self.dropped.saturating_add(1);
            return;
        }
        self.events[self.head] = Some(event);
        self.head = next_head;
    }

    fn pop(&mut self) -> Option<KeyEvent> {
        if self.tail == self.head {
            return None;
        }
        let event = self.events[self.tail].take();
        self.tail = (self.tail + 1) % EVENT_QUEUE_CAPACITY;
        event
    }
}

struct KeyboardCell(UnsafeCell<KeyboardState>);

// SAFETY: keyboard state is only touched from the main loop; no interrupt handler reads it.
unsafe impl Sync for KeyboardCell {}

static KEYBOARD: KeyboardCell = KeyboardCell(UnsafeCell::new(KeyboardState::new()));

pub fn init() -> KeyboardInitReport {
    // SAFETY: single-threaded early boot.
    let state = unsafe { &mut *KEYBOARD.0.get() };
    *state = KeyboardState::new();

    let mut command: PortWriteOnly<u8> = PortWriteOnly::new(PS2_COMMAND);
    while read_status() & STATUS_INPUT_FULL != 0 {
        core::hint::spin_loop();
    }
    // SAFETY: 0xAE on the controller command port only (re)enables the first PS/2 port.
    unsafe {
        command.write(COMMAND_ENABLE_FIRST_PORT);
    }

    // Bytes typed before boot would otherwise show up as phantom input.
    let mut flushed_bytes = 0;
    while read_data_byte().is_some() {
        flushed_bytes += 1;
        if flushed_bytes >= EVENT_QUEUE_CAPACITY {
            break;
        }
    }

    KeyboardInitReport {
        flushed_bytes,
        queue_capacity: EVENT_QUEUE_CAPACITY,
    }
}

/// Drains pending controller bytes, then returns the oldest decoded event.
pub fn poll_event() -> Option<KeyEvent> {
    // SAFETY: keyboard state is only accessed on the main loop thread.
    let state = unsafe { &mut *KEYBOARD.0.get() };
    for _ in 0..MAX_BYTES_PER_POLL {
        match read_data_byte() {
            Some(scancode) => state.handle_scancode(scancode),
            None => break,
        }
    }
    state.pop()
}

pub fn dropped_events() -> u64 {
    // SAFETY: keyboard state is only accessed on the main loop thread.
    unsafe { (*KEYBOARD.0.get()).dropped }
}

fn read_status() -> u8 {
    let mut status: PortReadOnly<u8> = PortReadOnly::new(PS2_STATUS);
    // SAFETY: reading the PS/2 status register has no side effects.
    unsafe { status.read() }
}

/// One keyboard byte if the controller has one. Mouse bytes are consumed and dropped.
fn read_data_byte() -> Option<u8> {
    loop {
        let status = read_status();
        if status & STATUS_OUTPUT_FULL == 0 {
            return None;
        }
        let mut data: PortReadOnly<u8> = PortReadOnly::new(PS2_DATA);
        // SAFETY: the output buffer is full, so reading port 0x60 consumes exactly that byte.
        let byte = unsafe { data.read() };
        if status & STATUS_AUX_DATA == 0 {
            return Some(byte);
        }
    }
}

fn decode(code: u8, extended: bool, shift: bool) -> Option<KeyCode> {
    if extended {
        return match code {
            0x48 => Some(KeyCode::ArrowUp),
            0x50 => Some(KeyCode::ArrowDown),
            0x4B => Some(KeyCode::ArrowLeft),
            0x4D => Some(KeyCode::ArrowRight),
            0x1C => Some(KeyCode::Byte(b'\n')), // keypad enter
            _ => None,
        };
    }

    let table = if shift { SET1_SHIFTED } else { SET1_PLAIN };
    match table.get(usize::from(code)).copied() {
        Some(0) | None => None,
        Some(byte) => Some(KeyCode::Byte(byte)),
    }
}
