// crates/laskar-core/tests/clock_props.rs: tick accounting over arbitrary polling patterns.
use laskar_core::clock::{COUNTER_PERIOD, CounterSample, HardwareCounter, TickClock, counter_distance};
use proptest::prelude::*;

/// Down-counter that moves by a scripted amount before every read.
struct Decrementing {
    value: u16,
    steps: Vec<u16>,
    next: usize,
}

impl HardwareCounter for Decrementing {
    fn poll_hardware_counter(&mut self) -> CounterSample {
        if let Some(step) = self.steps.get(self.next) {
            self.value = self.value.wrapping_sub(*step);
        }
        self.next += 1;
        CounterSample(self.value)
    }
}

proptest! {
    #[test]
    fn distance_recovers_any_sub_period_decrement(start in any::<u16>(), step in any::<u16>()) {
        let now = start.wrapping_sub(step);
        prop_assert_eq!(counter_distance(CounterSample(start), CounterSample(now)), u32::from(step));
    }

    #[test]
    fn ticks_are_whole_periods_of_travel(
        start in any::<u16>(),
        steps in prop::collection::vec(any::<u16>(), 1..400),
    ) {
        // First read is the baseline; the step list only applies from the second read on.
        let mut script = vec![0];
        script.extend(steps.iter().copied());
        let mut clock = TickClock::new(Decrementing { value: start, steps: script, next: 0 });

        let mut travelled = 0u64;
        let mut previous = 0u64;
        for step in &steps {
            let ticks = clock.poll();
            travelled += u64::from(*step);

            prop_assert!(ticks >= previous);
            prop_assert!(ticks - previous <= 1);
            prop_assert_eq!(ticks, travelled / u64::from(COUNTER_PERIOD));
            prop_assert_eq!(
                u64::from(clock.state().accumulated_subticks()),
                travelled % u64::from(COUNTER_PERIOD)
            );
            previous = ticks;
        }
    }

    #[test]
    fn stalled_counter_never_ticks(value in any::<u16>(), polls in 1usize..200) {
        let mut clock = TickClock::new(Decrementing { value, steps: Vec::new(), next: 0 });
        for _ in 0..polls {
            prop_assert_eq!(clock.poll(), 0);
        }
        prop_assert_eq!(clock.state().accumulated_subticks(), 0);
    }
}
