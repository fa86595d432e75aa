// kernel/src/time.rs: polled tick clock over PIT channel 0.
use crate::arch::x86_64::pit::{self, PIT_INPUT_HZ, PitCounter};
use core::cell::UnsafeCell;
use laskar_core::clock::{COUNTER_PERIOD, TickClock};

struct ClockCell(UnsafeCell<Option<TickClock<PitCounter>>>);

// SAFETY: the clock is only polled from the main loop; interrupts are disabled.
unsafe impl Sync for ClockCell {}

static CLOCK: ClockCell = ClockCell(UnsafeCell::new(None));

#[derive(Clone, Copy)]
pub struct ClockInitReport {
    pub source: &'static str,
    pub mode: u8,
    pub period: u32,
    pub tick_micros: u64,
    pub first_sample: u16,
}

pub fn init() -> ClockInitReport {
    let pit_report = pit::init_free_running();
    let clock = TickClock::new(PitCounter);
    let first_sample = clock.state().last_sample().get();
    // SAFETY: single-threaded early boot; nothing else holds a reference yet.
    unsafe {
        *CLOCK.0.get() = Some(clock);
    }

    ClockInitReport {
        source: "pit-ch0-polled",
        mode: pit_report.mode,
        period: pit_report.period,
        tick_micros: ticks_to_micros(1),
        first_sample,
    }
}

/// Runs `f` with exclusive access to the clock. `None` before `init`.
///
/// `f` must not call back into this module.
pub fn with_clock<R>(f: impl FnOnce(&mut TickClock<PitCounter>) -> R) -> Option<R> {
    // SAFETY: main-loop only and never re-entered, so this is the sole live reference.
    let slot = unsafe { &mut *CLOCK.0.get() };
    slot.as_mut().map(f)
}

/// Polls the counter and returns the logical tick count.
pub fn ticks() -> u64 {
    with_clock(|clock| clock.poll()).unwrap_or(0)
}

pub fn uptime_millis() -> u64 {
    ticks_to_micros(ticks()) / 1000
}

/// One tick is one full counter period, about 54.9 ms.
pub const fn ticks_to_micros(ticks: u64) -> u64 {
    ticks.saturating_mul(COUNTER_PERIOD as u64 * 1_000_000) / PIT_INPUT_HZ as u64
}
