// kernel/src/serial.rs: COM1 (0x3F8) output for boot reports and logs, plus polled input.
use core::fmt::{self, Write};
use core::hint::spin_loop;
use laskar_core::abi::serial_bytes;
use spin::Mutex;
use x86_64::instructions::port::{Port, PortReadOnly, PortWriteOnly};

const COM1_BASE: u16 = 0x3F8;

const LINE_STATUS_DATA_READY: u8 = 0x01;
const LINE_STATUS_TRANSMIT_EMPTY: u8 = 0x20;

static SERIAL1: Mutex<SerialPort> = Mutex::new(SerialPort::new(COM1_BASE));

pub fn init() {
    SERIAL1.lock().init();
}

pub fn write_line(message: &str) {
    let _ = writeln!(SERIAL1.lock(), "{message}");
}

pub fn write_str(message: &str) {
    let _ = SERIAL1.lock().write_str(message);
}

pub fn write_byte(byte: u8) {
    SERIAL1.lock().put(byte);
}

pub fn write_fmt(args: fmt::Arguments<'_>) {
    let _ = SERIAL1.lock().write_fmt(args);
}

pub fn try_read_byte() -> Option<u8> {
    SERIAL1.lock().read_byte()
}

/// Releases the port lock so a panic raised mid-write can still report.
///
/// # Safety
/// Only for the panic path: the interrupted writer never resumes.
pub unsafe fn force_unlock() {
    // SAFETY: forwarded from the caller contract above.
    unsafe { SERIAL1.force_unlock() }
}

struct SerialPort {
    data: Port<u8>,
    interrupt_enable: PortWriteOnly<u8>,
    fifo_control: PortWriteOnly<u8>,
    line_control: PortWriteOnly<u8>,
    modem_control: PortWriteOnly<u8>,
    line_status: PortReadOnly<u8>,
}

impl SerialPort {
    const fn new(base: u16) -> Self {
        Self {
            data: Port::new(base),
            interrupt_enable: PortWriteOnly::new(base + 1),
            fifo_control: PortWriteOnly::new(base + 2),
            line_control: PortWriteOnly::new(base + 3),
            modem_control: PortWriteOnly::new(base + 4),
            line_status: PortReadOnly::new(base + 5),
        }
    }

    fn init(&mut self) {
        // SAFETY: these are standard 16550A register writes for COM1 initialization.
        unsafe {
            self.interrupt_enable.write(0x00); // polled: no UART interrupts
            self.line_control.write(0x80); // DLAB on
            self.data.write(0x03); // divisor low byte (38400 baud)
            self.interrupt_enable.write(0x00); // divisor high byte
            self.line_control.write(0x03); // 8N1, DLAB off
            self.fifo_control.write(0xC7); // enable + clear FIFOs, 14-byte threshold
            self.modem_control.write(0x03); // DTR + RTS
        }
    }

    fn line_status(&mut self) -> u8 {
        // SAFETY: reading the line-status register has no side effects on the 16550A.
        unsafe { self.line_status.read() }
    }

    fn write_byte(&mut self, byte: u8) {
        while self.line_status() & LINE_STATUS_TRANSMIT_EMPTY == 0 {
            spin_loop();
        }
        // SAFETY: the transmit holding register is empty, checked above.
        unsafe {
            self.data.write(byte);
        }
    }

    fn put(&mut self, byte: u8) {
        for wire in serial_bytes(byte) {
            self.write_byte(wire);
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.line_status() & LINE_STATUS_DATA_READY == 0 {
            return None;
        }
        // SAFETY: data register read is valid when the line status reports buffered input.
        Some(unsafe { self.data.read() })
    }
}

impl Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.put(byte);
        }
        Ok(())
    }
}
