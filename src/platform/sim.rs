//! Software model of timer channels for host builds and tests.
//!
//! Each channel has a 16-bit counter, a comparator, two interrupt enables and
//! two latched flags. Nothing counts by itself: [`SimBackend::step`] is one
//! clock tick and [`HwTimers::advance`] additionally plays the interrupt
//! controller.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::{
    Event, Frequency, HwTimers, Result, Tick, TimerError, TimerId,
    backend::{Line, TimerBackend},
};

#[derive(Clone, Copy, Debug)]
struct Channel {
    frequency: Option<Frequency>,
    counter: Tick,
    compare: Tick,
    compare_enabled: bool,
    overflow_enabled: bool,
    compare_flag: bool,
    overflow_flag: bool,
}

impl Channel {
    const fn new() -> Self {
        Self {
            frequency: None,
            counter: 0,
            compare: 0,
            compare_enabled: false,
            overflow_enabled: false,
            compare_flag: false,
            overflow_flag: false,
        }
    }

    fn enabled(&mut self, line: Line) -> &mut bool {
        match line {
            Line::Compare => &mut self.compare_enabled,
            Line::Overflow => &mut self.overflow_enabled,
        }
    }

    fn flag(&mut self, line: Line) -> &mut bool {
        match line {
            Line::Compare => &mut self.compare_flag,
            Line::Overflow => &mut self.overflow_flag,
        }
    }
}

/// Simulated backend with `N` channels.
pub struct SimBackend<const N: usize> {
    channels: Mutex<RefCell<[Channel; N]>>,
    only: Option<Frequency>,
}

impl<const N: usize> SimBackend<N> {
    /// Backend that runs at every [`Frequency`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            channels: Mutex::new(RefCell::new([Channel::new(); N])),
            only: None,
        }
    }

    /// Backend that can only run at `frequency`.
    #[must_use]
    pub const fn supporting(frequency: Frequency) -> Self {
        Self {
            channels: Mutex::new(RefCell::new([Channel::new(); N])),
            only: Some(frequency),
        }
    }

    fn with<R>(&self, id: TimerId, f: impl FnOnce(&mut Channel) -> R) -> Option<R> {
        critical_section::with(|cs| {
            self.channels
                .borrow_ref_mut(cs)
                .get_mut(usize::from(id))
                .map(f)
        })
    }

    /// Advance channel `id` by one tick if it is running.
    ///
    /// Latches the overflow flag when the counter wraps to zero and the
    /// compare flag when it lands on the comparator.
    pub fn step(&self, id: TimerId) {
        self.with(id, |ch| {
            if ch.frequency.is_none() {
                return;
            }
            ch.counter = ch.counter.wrapping_add(1);
            if ch.counter == 0 {
                ch.overflow_flag = true;
            }
            if ch.counter == ch.compare {
                ch.compare_flag = true;
            }
        });
    }

    /// Event the interrupt controller would deliver next for channel `id`.
    #[must_use]
    pub fn pending(&self, id: TimerId) -> Option<Event> {
        self.with(id, |ch| {
            if ch.compare_flag && ch.compare_enabled {
                Some(Event::Compare)
            } else if ch.overflow_flag && ch.overflow_enabled {
                Some(Event::Overflow)
            } else {
                None
            }
        })
        .flatten()
    }

    /// Overwrite the counter without raising any flag.
    pub fn set_counter(&self, id: TimerId, tick: Tick) {
        self.with(id, |ch| ch.counter = tick);
    }

    #[must_use]
    pub fn compare(&self, id: TimerId) -> Tick {
        self.with(id, |ch| ch.compare).unwrap_or(0)
    }

    /// Rate channel `id` was configured with, if any.
    #[must_use]
    pub fn frequency(&self, id: TimerId) -> Option<Frequency> {
        self.with(id, |ch| ch.frequency).flatten()
    }
}

impl<const N: usize> Default for SimBackend<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TimerBackend for SimBackend<N> {
    fn configure(&self, id: TimerId, frequency: Frequency) -> Result<()> {
        if self.only.is_some_and(|only| only != frequency) {
            return Err(TimerError::UnsupportedFrequency);
        }
        self.with(id, |ch| ch.frequency = Some(frequency));
        Ok(())
    }

    fn counter(&self, id: TimerId) -> Tick {
        self.with(id, |ch| ch.counter).unwrap_or(0)
    }

    /// Clearing the counter raises the overflow flag, the way timers that
    /// generate an update event on reinitialization do.
    fn clear_counter(&self, id: TimerId) {
        self.with(id, |ch| {
            ch.counter = 0;
            ch.overflow_flag = true;
        });
    }

    fn set_compare(&self, id: TimerId, tick: Tick) {
        self.with(id, |ch| ch.compare = tick);
    }

    fn set_interrupt_enabled(&self, id: TimerId, line: Line, enabled: bool) {
        self.with(id, |ch| *ch.enabled(line) = enabled);
    }

    fn is_interrupt_enabled(&self, id: TimerId, line: Line) -> bool {
        self.with(id, |ch| *ch.enabled(line)).unwrap_or(false)
    }

    fn is_flag_set(&self, id: TimerId, line: Line) -> bool {
        self.with(id, |ch| *ch.flag(line)).unwrap_or(false)
    }

    fn clear_flag(&self, id: TimerId, line: Line) {
        self.with(id, |ch| *ch.flag(line) = false);
    }
}

impl<const N: usize> HwTimers<SimBackend<N>, N> {
    /// Let `ticks` ticks elapse on channel `id`, delivering interrupts after
    /// each one like an enabled interrupt controller.
    pub fn advance(&self, id: TimerId, ticks: u32) {
        for _ in 0..ticks {
            self.backend().step(id);
            self.service(id);
        }
    }

    /// Deliver whatever is pending on channel `id` without advancing time.
    pub fn service(&self, id: TimerId) {
        // At most one compare and one overflow can be latched at a time.
        for _ in 0..2 {
            let Some(event) = self.backend().pending(id) else {
                break;
            };
            critical_section::with(|cs| self.on_interrupt(cs, id, event));
        }
    }
}
