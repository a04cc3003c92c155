#![cfg_attr(not(test), no_std)]

//! Hardware timer channels with one-shot compare and overflow callbacks.
//!
//! Each channel is a free-running counter paired with a comparator. The
//! [`HwTimers`] driver keeps one control block per channel and drives the
//! platform registers through a [`TimerBackend`]. Interrupt vectors re-enter
//! the driver through [`HwTimers::on_interrupt`].

#[macro_use]
mod log;

pub mod backend;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod frequency;
pub mod platform;
pub mod registry;

pub use backend::{Line, TimerBackend};
pub use dispatch::Event;
pub use driver::HwTimers;
pub use error::{Result, TimerError};
pub use frequency::{FREQ_1MS, FREQ_32K, Frequency, TICKS_1MS, TICKS_32K};
pub use registry::{ControlBlock, TimerState};

#[cfg(feature = "attiny2313")]
pub use attiny_hal as hal;

/// Counter value of a channel. Wraps modulo its width.
pub type Tick = u16;

/// Channel identifier, an index into the registry.
pub type TimerId = u8;

/// Handler invoked from interrupt context. Must be short and must not block.
pub type Callback = fn();

/// Number of timer channels on the selected platform.
pub const HWTIMER_NUM: usize = platform::PLATFORM_NUM_TIMERS;

/// Timer driver for the selected platform.
pub type Timers = HwTimers<platform::Backend, HWTIMER_NUM>;
