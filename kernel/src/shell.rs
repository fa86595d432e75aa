// kernel/src/shell.rs: line-based in-kernel shell fed by polled keyboard and serial bytes.
use crate::keyboard::{self, KeyCode};
use crate::{console, serial, snake, time, version};
use core::cell::UnsafeCell;
use core::str;
use laskar_core::abi::{SHELL_COMMANDS, shell_prompt};

const MAX_LINE_LEN: usize = 128;

struct ShellCell(UnsafeCell<ShellState>);

// SAFETY: shell state is accessed only on the main loop thread.
unsafe impl Sync for ShellCell {}

static SHELL_STATE: ShellCell = ShellCell(UnsafeCell::new(ShellState::new()));

struct ShellState {
    line: [u8; MAX_LINE_LEN],
    len: usize,
}

impl ShellState {
    const fn new() -> Self {
        Self {
            line: [0; MAX_LINE_LEN],
            len: 0,
        }
    }

    /// Appends a printable byte; input past the buffer end is dropped, never wrapped.
    fn push(&mut self, byte: u8) -> bool {
        if self.len >= MAX_LINE_LEN {
            return false;
        }
        self.line[self.len] = byte;
        self.len += 1;
        true
    }

    fn pop(&mut self) -> bool {
        if self.len == 0 {
            return false;
        }
        self.len -= 1;
        true
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}

pub fn init() {
    serial::write_fmt(format_args!(
        "Shell: line mode ready max_line={} commands={}\n",
        MAX_LINE_LEN,
        SHELL_COMMANDS.len()
    ));
    print_prompt();
}

pub fn poll() {
    while let Some(event) = keyboard::poll_event() {
        if let (true, KeyCode::Byte(byte)) = (event.pressed, event.code) {
            process_byte(byte);
        }
    }
    while let Some(byte) = serial::try_read_byte() {
        process_byte(byte);
    }
}

fn process_byte(byte: u8) {
    // SAFETY: shell is single-threaded and only mutated from main loop.
    let shell = unsafe { &mut *SHELL_STATE.0.get() };

    match byte {
        b'\n' | b'\r' => {
            console::write_byte(b'\n');
            run_command(shell);
            shell.clear();
            print_prompt();
        }
        0x08 | 0x7f => {
            if shell.pop() {
                console::write_str("\x08 \x08");
            }
        }
        0x20..=0x7e => {
            if shell.push(byte) {
                console::write_byte(byte);
            }
        }
        _ => {}
    }
}

fn run_command(shell: &mut ShellState) {
    let input = match str::from_utf8(&shell.line[..shell.len]) {
        Ok(text) => text.trim(),
        Err(_) => {
            console::write_line("shell: invalid utf-8 input");
            return;
        }
    };
    if input.is_empty() {
        return;
    }

    match input {
        "help" => {
            console::write_str("commands:");
            for command in SHELL_COMMANDS {
                console::write_fmt(format_args!(" {command}"));
            }
            console::write_byte(b'\n');
        }
        "version" => console::write_fmt(format_args!(
            "version: {}.{}.{}\n",
            version::MAJOR,
            version::MINOR,
            version::BUILD
        )),
        "ticks" => console::write_fmt(format_args!("ticks={}\n", time::ticks())),
        "uptime" => {
            let millis = time::uptime_millis();
            console::write_fmt(format_args!(
                "uptime: {}.{:03}s ticks={}\n",
                millis / 1000,
                millis % 1000,
                time::ticks()
            ));
        }
        "clear" => console::clear(),
        "echo" => console::write_byte(b'\n'),
        "snake" => {
            log::info!("shell: starting snake");
            snake::run();
        }
        _ => {
            if let Some(text) = input.strip_prefix("echo ") {
                console::write_line(text);
            } else {
                console::write_fmt(format_args!("unknown command: {input} (try `help`)\n"));
            }
        }
    }
}

fn print_prompt() {
    console::write_str(shell_prompt());
}
