// crates/laskar-core/src/clock.rs: logical ticks accumulated from a free-running 16-bit down-counter.

/// Units in one full counter period. One logical tick is promoted per period of distance.
pub const COUNTER_PERIOD: u32 = 65_536;

/// Raw counter value. The hardware counts down and reloads after reaching zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CounterSample(pub u16);

impl CounterSample {
    pub const fn get(self) -> u16 {
        self.0
    }
}

pub trait HardwareCounter {
    fn poll_hardware_counter(&mut self) -> CounterSample;
}

impl<H: HardwareCounter + ?Sized> HardwareCounter for &mut H {
    fn poll_hardware_counter(&mut self) -> CounterSample {
        (**self).poll_hardware_counter()
    }
}

/// Anything that can report the current logical tick count. The fixed-timestep loop only
/// depends on this, so tests can drive it with a hand-cranked clock.
pub trait TickSource {
    fn poll_ticks(&mut self) -> u64;
}

/// Forward distance travelled from `old` to `now` on a down-counter.
///
/// A sample above the previous one means the counter passed zero and reloaded. At most one
/// reload between the two samples is assumed; callers must poll faster than one period.
pub const fn counter_distance(old: CounterSample, now: CounterSample) -> u32 {
    if now.0 <= old.0 {
        (old.0 - now.0) as u32
    } else {
        old.0 as u32 + (COUNTER_PERIOD - now.0 as u32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickState {
    last_sample: CounterSample,
    accumulated_subticks: u32,
    tick_count: u64,
}

impl TickState {
    pub const fn new(initial: CounterSample) -> Self {
        Self {
            last_sample: initial,
            accumulated_subticks: 0,
            tick_count: 0,
        }
    }

    pub fn advance(&mut self, sample: CounterSample) -> u64 {
        let distance = counter_distance(self.last_sample, sample);
        self.last_sample = sample;
        self.accumulated_subticks += distance;

        while self.accumulated_subticks >= COUNTER_PERIOD {
            self.accumulated_subticks -= COUNTER_PERIOD;
            self.tick_count = self.tick_count.saturating_add(1);
        }

        self.tick_count
    }

    pub const fn last_sample(&self) -> CounterSample {
        self.last_sample
    }

    pub const fn accumulated_subticks(&self) -> u32 {
        self.accumulated_subticks
    }

    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

/// Owned clock over a hardware counter. `tick_count` starts at zero from the first poll.
pub struct TickClock<H> {
    counter: H,
    state: TickState,
}

impl<H: HardwareCounter> TickClock<H> {
    pub fn new(mut counter: H) -> Self {
        let initial = counter.poll_hardware_counter();
        Self {
            counter,
            state: TickState::new(initial),
        }
    }

    pub fn poll(&mut self) -> u64 {
        let sample = self.counter.poll_hardware_counter();
        self.state.advance(sample)
    }

    /// Reads the counter without accounting the distance. Used as a cheap jitter source.
    pub fn sample_counter(&mut self) -> u16 {
        self.counter.poll_hardware_counter().get()
    }

    pub const fn ticks(&self) -> u64 {
        self.state.tick_count()
    }

    pub const fn state(&self) -> &TickState {
        &self.state
    }
}

impl<H: HardwareCounter> TickSource for TickClock<H> {
    fn poll_ticks(&mut self) -> u64 {
        self.poll()
    }
}
