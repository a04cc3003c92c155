//! Fixed table of per-channel control blocks.

use core::cell::{RefCell, RefMut};

use critical_section::{CriticalSection, Mutex};

use crate::{Callback, Frequency, Result, Tick, TimerError, TimerId};

/// Scheduling state of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerState {
    /// Never initialized.
    Uninitialized,
    /// Initialized, no compare armed.
    Idle,
    /// Compare armed to fire once at `target`.
    Scheduled { target: Tick },
}

/// Configuration and state of one channel.
#[derive(Clone, Copy, Debug)]
pub struct ControlBlock {
    id: TimerId,
    state: TimerState,
    frequency: Option<Frequency>,
    compare_callback: Option<Callback>,
    overflow_callback: Option<Callback>,
}

impl ControlBlock {
    const fn new(id: TimerId) -> Self {
        Self {
            id,
            state: TimerState::Uninitialized,
            frequency: None,
            compare_callback: None,
            overflow_callback: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> TimerId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Rate the channel was initialized with.
    pub(crate) fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    /// Tick the armed compare is due at.
    #[cfg(test)]
    pub(crate) fn target(&self) -> Option<Tick> {
        match self.state {
            TimerState::Scheduled { target } => Some(target),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state != TimerState::Uninitialized
    }

    pub(crate) fn compare_callback(&self) -> Option<Callback> {
        self.compare_callback
    }

    pub(crate) fn overflow_callback(&self) -> Option<Callback> {
        self.overflow_callback
    }

    pub(crate) fn configure(
        &mut self,
        frequency: Frequency,
        compare_callback: Option<Callback>,
        overflow_callback: Option<Callback>,
    ) {
        debug_assert!(!self.is_initialized());

        self.frequency = Some(frequency);
        self.compare_callback = compare_callback;
        self.overflow_callback = overflow_callback;
        self.state = TimerState::Idle;
    }

    pub(crate) fn arm(&mut self, target: Tick) {
        debug_assert!(self.is_initialized());
        self.state = TimerState::Scheduled { target };
    }

    /// Drop an armed compare. Returns `true` if one was armed.
    pub(crate) fn disarm(&mut self) -> bool {
        let scheduled = matches!(self.state, TimerState::Scheduled { .. });
        if scheduled {
            self.state = TimerState::Idle;
        }
        scheduled
    }
}

/// Table of `N` control blocks shared between normal and interrupt context.
pub struct Registry<const N: usize> {
    blocks: Mutex<RefCell<[ControlBlock; N]>>,
}

impl<const N: usize> Registry<N> {
    /// Create a registry with every block uninitialized.
    #[must_use]
    pub const fn new() -> Self {
        assert!(N <= TimerId::MAX as usize + 1, "too many timer channels");

        let mut blocks = [ControlBlock::new(0); N];
        let mut i = 0;
        while i < N {
            blocks[i] = ControlBlock::new(i as TimerId);
            i += 1;
        }

        Self {
            blocks: Mutex::new(RefCell::new(blocks)),
        }
    }

    /// Borrow the control block of channel `id`.
    ///
    /// # Errors
    ///
    /// [`TimerError::IdOutOfRange`] if `id` does not name a channel.
    pub fn lookup<'cs>(
        &'cs self,
        cs: CriticalSection<'cs>,
        id: TimerId,
    ) -> Result<RefMut<'cs, ControlBlock>> {
        let index = usize::from(id);
        if index >= N {
            return Err(TimerError::IdOutOfRange);
        }

        Ok(RefMut::map(self.blocks.borrow_ref_mut(cs), |blocks| {
            &mut blocks[index]
        }))
    }

    /// Snapshot of the state of channel `id`.
    #[must_use]
    pub fn state(&self, cs: CriticalSection<'_>, id: TimerId) -> Option<TimerState> {
        self.lookup(cs, id).ok().map(|block| block.state())
    }
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}
