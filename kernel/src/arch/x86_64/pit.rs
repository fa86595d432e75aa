// kernel/src/arch/x86_64/pit.rs: 8253/8254 PIT channel 0 as a free-running polled down-counter.
use laskar_core::clock::{COUNTER_PERIOD, CounterSample, HardwareCounter};
use x86_64::instructions::port::{Port, PortWriteOnly};

const PIT_COMMAND: u16 = 0x43;
const PIT_CHANNEL_0: u16 = 0x40;
pub const PIT_INPUT_HZ: u32 = 1_193_182;

const PIT_MODE_RATE_GENERATOR: u8 = 0x34; // channel 0, low/high byte, mode 2, binary
const PIT_LATCH_CHANNEL_0: u8 = 0x00;

/// Reload value 0 selects the full 65536-count period.
const FREE_RUNNING_RELOAD: u16 = 0;

#[derive(Clone, Copy)]
pub struct PitInitReport {
    pub mode: u8,
    pub period: u32,
}

/// Programs channel 0 to count down over the whole 16-bit range. No IRQ is unmasked.
pub fn init_free_running() -> PitInitReport {
    let mut command: PortWriteOnly<u8> = PortWriteOnly::new(PIT_COMMAND);
    let mut data: Port<u8> = Port::new(PIT_CHANNEL_0);
    let [low, high] = FREE_RUNNING_RELOAD.to_le_bytes();

    // SAFETY: PIT programming uses fixed x86 timer ports.
    unsafe {
        command.write(PIT_MODE_RATE_GENERATOR);
        data.write(low);
        data.write(high);
    }

    PitInitReport {
        mode: PIT_MODE_RATE_GENERATOR,
        period: COUNTER_PERIOD,
    }
}

/// Latches channel 0 and reads the current count, low byte first.
pub fn read_counter() -> u16 {
    let mut command: PortWriteOnly<u8> = PortWriteOnly::new(PIT_COMMAND);
    let mut data: Port<u8> = Port::new(PIT_CHANNEL_0);

    // SAFETY: the latch command freezes the count so the two data reads see one value;
    // interrupts stay disabled, so nothing else touches the PIT between them.
    unsafe {
        command.write(PIT_LATCH_CHANNEL_0);
        let low = data.read();
        let high = data.read();
        u16::from_le_bytes([low, high])
    }
}

/// Zero-sized handle over channel 0 for the tick clock.
pub struct PitCounter;

impl HardwareCounter for PitCounter {
    fn poll_hardware_counter(&mut self) -> CounterSample {
        CounterSample(read_counter())
    }
}
