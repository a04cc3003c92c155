//! Interrupt-context entry point.

use critical_section::CriticalSection;

use crate::{
    HwTimers, TimerId,
    backend::{Line, TimerBackend},
};

/// Hardware event reported by a timer interrupt vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The counter reached the comparator.
    Compare,
    /// The counter wrapped to zero.
    Overflow,
}

impl From<Event> for Line {
    fn from(event: Event) -> Self {
        match event {
            Event::Compare => Line::Compare,
            Event::Overflow => Line::Overflow,
        }
    }
}

impl<B: TimerBackend, const N: usize> HwTimers<B, N> {
    /// Handle `event` of channel `id`. Call this from the channel's interrupt
    /// vector, which already runs with interrupts disabled.
    ///
    /// A compare event disarms the channel before its callback runs, so each
    /// schedule fires at most once. An overflow event leaves the scheduling
    /// state alone. Events for invalid or uninitialized channels are ignored.
    ///
    /// Callbacks run after the registry is released and may call back into
    /// the driver, e.g. to arm the next compare.
    pub fn on_interrupt(&self, cs: CriticalSection<'_>, id: TimerId, event: Event) {
        let callback = match self.registry.lookup(cs, id) {
            Ok(mut block) if block.is_initialized() => {
                self.backend.clear_flag(id, event.into());
                match event {
                    Event::Compare => {
                        self.backend.set_interrupt_enabled(id, Line::Compare, false);
                        // A match with nothing armed has no one to notify.
                        if block.disarm() {
                            block.compare_callback()
                        } else {
                            None
                        }
                    }
                    Event::Overflow => block.overflow_callback(),
                }
            }
            _ => None,
        };

        if let Some(callback) = callback {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::{Frequency, TimerState, platform::sim::SimBackend};

    type Timers = HwTimers<SimBackend<2>, 2>;

    #[test]
    fn compare_event_disarms_then_calls_back() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn on_compare() {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }

        let timers = Timers::new(SimBackend::new());
        timers.initialize(0, Frequency::Ms1, Some(on_compare), None).unwrap();
        timers.schedule_at(0, 7).unwrap();

        critical_section::with(|cs| timers.on_interrupt(cs, 0, Event::Compare));

        assert_eq!(FIRED.load(Ordering::SeqCst), 1);
        assert_eq!(timers.state(0), Some(TimerState::Idle));
        assert!(!timers.backend().is_interrupt_enabled(0, Line::Compare));
    }

    #[test]
    fn overflow_event_keeps_schedule() {
        static WRAPS: AtomicU32 = AtomicU32::new(0);
        fn on_overflow() {
            WRAPS.fetch_add(1, Ordering::SeqCst);
        }

        let timers = Timers::new(SimBackend::new());
        timers.initialize(1, Frequency::Khz32, None, Some(on_overflow)).unwrap();
        timers.schedule_at(1, 9).unwrap();

        critical_section::with(|cs| timers.on_interrupt(cs, 1, Event::Overflow));

        assert_eq!(WRAPS.load(Ordering::SeqCst), 1);
        assert_eq!(timers.state(1), Some(TimerState::Scheduled { target: 9 }));
    }

    #[test]
    fn missing_callbacks_are_skipped() {
        let timers = Timers::new(SimBackend::new());
        timers.initialize(0, Frequency::Ms1, None, None).unwrap();
        timers.schedule_at(0, 1).unwrap();

        critical_section::with(|cs| {
            timers.on_interrupt(cs, 0, Event::Compare);
            timers.on_interrupt(cs, 0, Event::Overflow);
        });

        assert_eq!(timers.state(0), Some(TimerState::Idle));
    }

    #[test]
    fn events_for_unknown_channels_are_ignored() {
        let timers = Timers::new(SimBackend::new());

        critical_section::with(|cs| {
            timers.on_interrupt(cs, 0, Event::Compare);
            timers.on_interrupt(cs, 5, Event::Overflow);
        });

        assert_eq!(timers.state(0), Some(TimerState::Uninitialized));
    }

    #[test]
    fn compare_without_schedule_does_not_call_back() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn on_compare() {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }

        let timers = Timers::new(SimBackend::new());
        timers.initialize(0, Frequency::Ms1, Some(on_compare), None).unwrap();

        critical_section::with(|cs| timers.on_interrupt(cs, 0, Event::Compare));

        assert_eq!(FIRED.load(Ordering::SeqCst), 0);
    }
}
