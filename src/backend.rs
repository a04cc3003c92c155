//! Register-level interface a platform supplies for its timer channels.

use crate::{Frequency, Result, Tick, TimerId};

/// Interrupt line of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Counter matched the comparator.
    Compare,
    /// Counter wrapped to zero.
    Overflow,
}

/// Per-channel register access.
///
/// The driver only calls these with ids below its channel count and always
/// from inside a critical section. Flags latch in hardware whether or not the
/// corresponding interrupt is enabled.
pub trait TimerBackend {
    /// Start the counter of channel `id` at `frequency`.
    ///
    /// # Errors
    ///
    /// [`TimerError::UnsupportedFrequency`](crate::TimerError::UnsupportedFrequency)
    /// if the rate cannot be realized. Registers must be left untouched then.
    fn configure(&self, id: TimerId, frequency: Frequency) -> Result<()>;

    /// Current counter value.
    fn counter(&self, id: TimerId) -> Tick;

    /// Set the counter to zero.
    fn clear_counter(&self, id: TimerId);

    /// Program the comparator.
    fn set_compare(&self, id: TimerId, tick: Tick);

    fn set_interrupt_enabled(&self, id: TimerId, line: Line, enabled: bool);

    fn is_interrupt_enabled(&self, id: TimerId, line: Line) -> bool;

    /// Whether the event of `line` has latched.
    fn is_flag_set(&self, id: TimerId, line: Line) -> bool;

    fn clear_flag(&self, id: TimerId, line: Line);
}

/// One interrupt line of one channel, masked for as long as this guard lives.
///
/// The line is enabled again on drop unless [`Masked::keep_masked`] was
/// called.
#[must_use]
pub struct Masked<'a, B: TimerBackend + ?Sized> {
    backend: &'a B,
    id: TimerId,
    line: Line,
    unmask: bool,
}

impl<'a, B: TimerBackend + ?Sized> Masked<'a, B> {
    pub fn new(backend: &'a B, id: TimerId, line: Line) -> Self {
        backend.set_interrupt_enabled(id, line, false);
        Self {
            backend,
            id,
            line,
            unmask: true,
        }
    }

    /// Leave the line disabled when the guard goes away.
    pub fn keep_masked(mut self) {
        self.unmask = false;
    }
}

impl<B: TimerBackend + ?Sized> Drop for Masked<'_, B> {
    fn drop(&mut self) {
        if self.unmask {
            self.backend.set_interrupt_enabled(self.id, self.line, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::sim::SimBackend;

    #[test]
    fn guard_restores_line_on_drop() {
        let backend = SimBackend::<1>::new();
        backend.set_interrupt_enabled(0, Line::Compare, true);
        {
            let _compare = Masked::new(&backend, 0, Line::Compare);
            assert!(!backend.is_interrupt_enabled(0, Line::Compare));
        }
        assert!(backend.is_interrupt_enabled(0, Line::Compare));
    }

    #[test]
    fn keep_masked_leaves_line_disabled() {
        let backend = SimBackend::<1>::new();
        backend.set_interrupt_enabled(0, Line::Overflow, true);

        Masked::new(&backend, 0, Line::Overflow).keep_masked();
        assert!(!backend.is_interrupt_enabled(0, Line::Overflow));
        assert!(!backend.is_interrupt_enabled(0, Line::Compare));
    }
}
