//! Normal-context operations on timer channels.
//!
//! Every mutating operation runs inside a critical section and masks the
//! affected interrupt line of the channel while it rewrites flags and
//! registers, so the channel's interrupt handler never observes a comparator
//! and flag pair that disagree.

use core::cell::RefMut;

use critical_section::CriticalSection;

use crate::{
    Callback, Frequency, Result, Tick, TimerError, TimerId, TimerState,
    backend::{Line, Masked, TimerBackend},
    registry::{ControlBlock, Registry},
};

/// Timer driver over `N` channels of backend `B`.
///
/// Meant to live in a `static`, built with [`HwTimers::new`].
pub struct HwTimers<B, const N: usize> {
    pub(crate) registry: Registry<N>,
    pub(crate) backend: B,
}

impl<B: TimerBackend, const N: usize> HwTimers<B, N> {
    /// Create a driver with every channel uninitialized.
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self {
            registry: Registry::new(),
            backend,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Start channel `id` at `frequency` and register its callbacks.
    ///
    /// `compare_callback` runs when a scheduled tick is reached,
    /// `overflow_callback` on every counter wraparound except one caused by
    /// [`reset_counter`](Self::reset_counter). Both run in interrupt context.
    ///
    /// # Errors
    ///
    /// [`TimerError::IdOutOfRange`], [`TimerError::AlreadyConfigured`] or
    /// [`TimerError::UnsupportedFrequency`]. Nothing is changed on error.
    pub fn initialize(
        &self,
        id: TimerId,
        frequency: Frequency,
        compare_callback: Option<Callback>,
        overflow_callback: Option<Callback>,
    ) -> Result<()> {
        critical_section::with(|cs| {
            let mut block = self.registry.lookup(cs, id)?;
            if block.is_initialized() {
                return Err(TimerError::AlreadyConfigured);
            }

            self.backend.configure(id, frequency)?;

            // Nothing armed yet, and nothing latched before now counts.
            self.backend.set_interrupt_enabled(id, Line::Compare, false);
            self.backend.clear_flag(id, Line::Compare);
            self.backend.clear_flag(id, Line::Overflow);
            self.backend.set_interrupt_enabled(id, Line::Overflow, true);

            block.configure(frequency, compare_callback, overflow_callback);
            Ok(())
        })
        .inspect(|_| debug!("timer {=u8}: initialized at {}", id, frequency))
        .inspect_err(|err| warn!("timer {=u8}: initialize rejected: {}", id, err))
    }

    /// Current counter of channel `id`, or zero if the channel is invalid or
    /// not initialized.
    #[must_use]
    pub fn read(&self, id: TimerId) -> Tick {
        critical_section::with(|cs| match self.configured(cs, id) {
            Ok(_) => self.backend.counter(id),
            Err(_) => 0,
        })
    }

    /// Arm channel `id` to fire once when its counter reaches `tick`.
    ///
    /// The counter is not touched. A `tick` behind the counter fires after
    /// the counter wraps around. An already armed compare is replaced.
    ///
    /// # Errors
    ///
    /// [`TimerError::IdOutOfRange`] or [`TimerError::NotInitialized`].
    pub fn schedule_at(&self, id: TimerId, tick: Tick) -> Result<()> {
        critical_section::with(|cs| {
            let mut block = self.configured(cs, id)?;
            self.arm(&mut block, tick);
            Ok(())
        })
        .inspect_err(|err| warn!("timer {=u8}: schedule rejected: {}", id, err))
    }

    /// Arm channel `id` to fire once `delay` ticks from now.
    ///
    /// # Errors
    ///
    /// Same as [`schedule_at`](Self::schedule_at).
    pub fn schedule_after(&self, id: TimerId, delay: Tick) -> Result<()> {
        critical_section::with(|cs| {
            let mut block = self.configured(cs, id)?;
            let target = self.backend.counter(id).wrapping_add(delay);
            self.arm(&mut block, target);
            Ok(())
        })
        .inspect_err(|err| warn!("timer {=u8}: schedule rejected: {}", id, err))
    }

    /// Drop the armed compare of channel `id`, if any. The counter keeps
    /// running.
    ///
    /// # Errors
    ///
    /// [`TimerError::IdOutOfRange`] or [`TimerError::NotInitialized`].
    pub fn cancel(&self, id: TimerId) -> Result<()> {
        critical_section::with(|cs| {
            let mut block = self.configured(cs, id)?;
            self.disarm(&mut block);
            Ok(())
        })
        .inspect(|_| trace!("timer {=u8}: cancelled", id))
        .inspect_err(|err| warn!("timer {=u8}: cancel rejected: {}", id, err))
    }

    /// Cancel channel `id` and set its counter to zero.
    ///
    /// The reset is not reported as an overflow.
    ///
    /// # Errors
    ///
    /// [`TimerError::IdOutOfRange`] or [`TimerError::NotInitialized`].
    pub fn reset_counter(&self, id: TimerId) -> Result<()> {
        critical_section::with(|cs| {
            let mut block = self.configured(cs, id)?;
            self.disarm(&mut block);

            let _overflow = Masked::new(&self.backend, id, Line::Overflow);
            // A wraparound latched before the reset is still delivered.
            let wrapped = self.backend.is_flag_set(id, Line::Overflow);
            self.backend.clear_counter(id);
            if !wrapped {
                self.backend.clear_flag(id, Line::Overflow);
            }
            Ok(())
        })
        .inspect(|_| debug!("timer {=u8}: counter reset", id))
        .inspect_err(|err| warn!("timer {=u8}: reset rejected: {}", id, err))
    }

    /// Whether channel `id` wrapped around and its handler has not run yet.
    ///
    /// `false` for invalid or uninitialized channels.
    #[must_use]
    pub fn is_overflow_pending(&self, id: TimerId) -> bool {
        self.is_pending(id, Line::Overflow)
    }

    /// Whether channel `id` reached its scheduled tick and its handler has
    /// not run yet.
    ///
    /// `false` for invalid or uninitialized channels.
    #[must_use]
    pub fn is_interrupt_pending(&self, id: TimerId) -> bool {
        self.is_pending(id, Line::Compare)
    }

    /// State of channel `id`, or `None` if `id` does not name a channel.
    #[must_use]
    pub fn state(&self, id: TimerId) -> Option<TimerState> {
        critical_section::with(|cs| self.registry.state(cs, id))
    }

    /// Rate channel `id` was initialized with, or `None` if the channel is
    /// invalid or not initialized.
    #[must_use]
    pub fn frequency(&self, id: TimerId) -> Option<Frequency> {
        critical_section::with(|cs| {
            self.registry
                .lookup(cs, id)
                .ok()
                .and_then(|block| block.frequency())
        })
    }

    fn configured<'cs>(
        &'cs self,
        cs: CriticalSection<'cs>,
        id: TimerId,
    ) -> Result<RefMut<'cs, ControlBlock>> {
        let block = self.registry.lookup(cs, id)?;
        if block.is_initialized() {
            Ok(block)
        } else {
            Err(TimerError::NotInitialized)
        }
    }

    fn is_pending(&self, id: TimerId, line: Line) -> bool {
        critical_section::with(|cs| {
            self.configured(cs, id).is_ok()
                && self.backend.is_interrupt_enabled(id, line)
                && self.backend.is_flag_set(id, line)
        })
    }

    fn arm(&self, block: &mut ControlBlock, tick: Tick) {
        let id = block.id();
        let _compare = Masked::new(&self.backend, id, Line::Compare);

        self.backend.clear_flag(id, Line::Compare);
        block.arm(tick);
        self.backend.set_compare(id, tick);
    }

    fn disarm(&self, block: &mut ControlBlock) {
        let id = block.id();
        let compare = Masked::new(&self.backend, id, Line::Compare);

        self.backend.clear_flag(id, Line::Compare);
        block.disarm();
        compare.keep_masked();
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::platform::sim::SimBackend;

    type Timers = HwTimers<SimBackend<2>, 2>;

    fn nop() {}

    #[test]
    fn initialize_moves_block_to_idle() {
        let timers = Timers::new(SimBackend::new());
        assert_eq!(timers.state(0), Some(TimerState::Uninitialized));

        timers.initialize(0, Frequency::Ms1, None, None).unwrap();

        assert_eq!(timers.state(0), Some(TimerState::Idle));
        assert_eq!(timers.backend().frequency(0), Some(Frequency::Ms1));
        assert_eq!(timers.frequency(0), Some(Frequency::Ms1));
        assert!(timers.backend().is_interrupt_enabled(0, Line::Overflow));
        assert!(!timers.backend().is_interrupt_enabled(0, Line::Compare));
    }

    #[test]
    fn second_initialize_keeps_first_configuration() {
        static FIRST: AtomicU32 = AtomicU32::new(0);
        fn first() {
            FIRST.fetch_add(1, Ordering::SeqCst);
        }

        let timers = Timers::new(SimBackend::new());
        timers.initialize(1, Frequency::Khz32, Some(first), None).unwrap();

        assert_eq!(
            timers.initialize(1, Frequency::Ms1, Some(nop), Some(nop)),
            Err(TimerError::AlreadyConfigured)
        );
        assert_eq!(timers.backend().frequency(1), Some(Frequency::Khz32));
        assert_eq!(timers.frequency(1), Some(Frequency::Khz32));

        timers.schedule_after(1, 3).unwrap();
        timers.advance(1, 3);
        assert_eq!(FIRST.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsupported_frequency_leaves_channel_uninitialized() {
        let timers = Timers::new(SimBackend::supporting(Frequency::Khz32));

        assert_eq!(
            timers.initialize(0, Frequency::Ms1, Some(nop), None),
            Err(TimerError::UnsupportedFrequency)
        );
        assert_eq!(timers.state(0), Some(TimerState::Uninitialized));
        assert_eq!(timers.backend().frequency(0), None);

        timers.initialize(0, Frequency::Khz32, Some(nop), None).unwrap();
    }

    #[test]
    fn operations_on_uninitialized_channel_fail() {
        let timers = Timers::new(SimBackend::new());

        assert_eq!(timers.schedule_at(0, 1), Err(TimerError::NotInitialized));
        assert_eq!(timers.schedule_after(0, 1), Err(TimerError::NotInitialized));
        assert_eq!(timers.cancel(0), Err(TimerError::NotInitialized));
        assert_eq!(timers.reset_counter(0), Err(TimerError::NotInitialized));
        assert_eq!(timers.state(0), Some(TimerState::Uninitialized));
    }

    #[test]
    fn queries_are_permissive() {
        let timers = Timers::new(SimBackend::new());
        timers.backend().set_counter(0, 77);

        assert_eq!(timers.read(0), 0);
        assert_eq!(timers.read(9), 0);
        assert!(!timers.is_overflow_pending(9));
        assert!(!timers.is_interrupt_pending(9));
        assert_eq!(timers.state(9), None);
        assert_eq!(timers.frequency(0), None);
        assert_eq!(timers.frequency(9), None);
    }

    #[test]
    fn schedule_at_programs_comparator_and_enables_compare() {
        let timers = Timers::new(SimBackend::new());
        timers.initialize(0, Frequency::Ms1, None, None).unwrap();

        timers.schedule_at(0, 300).unwrap();

        assert_eq!(timers.state(0), Some(TimerState::Scheduled { target: 300 }));
        assert_eq!(timers.backend().compare(0), 300);
        assert!(timers.backend().is_interrupt_enabled(0, Line::Compare));
    }

    #[test]
    fn rescheduling_replaces_target() {
        let timers = Timers::new(SimBackend::new());
        timers.initialize(0, Frequency::Ms1, None, None).unwrap();

        timers.schedule_at(0, 300).unwrap();
        timers.schedule_at(0, 20).unwrap();

        assert_eq!(timers.state(0), Some(TimerState::Scheduled { target: 20 }));
        assert_eq!(timers.backend().compare(0), 20);
    }

    #[test]
    fn schedule_after_wraps_target() {
        let timers = Timers::new(SimBackend::new());
        timers.initialize(0, Frequency::Ms1, None, None).unwrap();
        timers.backend().set_counter(0, Tick::MAX - 1);

        timers.schedule_after(0, 5).unwrap();

        assert_eq!(timers.state(0), Some(TimerState::Scheduled { target: 3 }));
    }

    #[test]
    fn cancel_disables_compare_and_keeps_counter() {
        let timers = Timers::new(SimBackend::new());
        timers.initialize(0, Frequency::Ms1, None, None).unwrap();
        timers.advance(0, 12);
        timers.schedule_after(0, 100).unwrap();

        timers.cancel(0).unwrap();

        assert_eq!(timers.state(0), Some(TimerState::Idle));
        assert_eq!(timers.read(0), 12);
        assert!(!timers.backend().is_interrupt_enabled(0, Line::Compare));

        // Cancelling an idle channel is a no-op.
        timers.cancel(0).unwrap();
        assert_eq!(timers.state(0), Some(TimerState::Idle));
    }

    #[test]
    fn reset_counter_leaves_overflow_line_enabled() {
        let timers = Timers::new(SimBackend::new());
        timers.initialize(0, Frequency::Ms1, None, None).unwrap();
        timers.advance(0, 40);

        timers.reset_counter(0).unwrap();

        assert_eq!(timers.read(0), 0);
        assert!(timers.backend().is_interrupt_enabled(0, Line::Overflow));
        assert!(!timers.is_overflow_pending(0));
    }

    #[test]
    fn stale_compare_match_after_cancel_is_not_pending() {
        let timers = Timers::new(SimBackend::new());
        timers.initialize(0, Frequency::Ms1, None, None).unwrap();
        timers.schedule_at(0, 4).unwrap();
        timers.cancel(0).unwrap();

        // The comparator still holds 4 and latches a match.
        timers.advance(0, 4);

        assert!(timers.backend().is_flag_set(0, Line::Compare));
        assert!(!timers.is_interrupt_pending(0));
    }
}
