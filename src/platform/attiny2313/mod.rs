//! ATtiny2313 backend: a single channel on the 16-bit `TC1` peripheral.
//!
//! `TC1` runs in normal mode and counts rising edges on the `T1` pin (PD5),
//! which the board feeds from a 32.768 kHz watch crystal oscillator. The
//! 1024 Hz rate has no exact divisor of the 8 MHz system clock and is
//! reported as unsupported.

use crate::{
    Frequency, Result, Tick, TimerError, TimerId,
    backend::{Line, TimerBackend},
    hal,
};

mod usart;

pub use usart::Usart0;

/// `TC1` is the only 16-bit timer on the chip.
pub const PLATFORM_NUM_TIMERS: usize = 1;

/// Board clock rate.
pub type BoardClock = hal::clock::MHz8;

type RegisterBlock = hal::pac::tc1::RegisterBlock;

/// Backend driving `TC1` registers directly.
pub struct Tc1 {
    _private: (),
}

impl Tc1 {
    /// Create the backend.
    ///
    /// # Safety
    ///
    /// `TC1` and the `TC1` bits of `TIMSK`/`TIFR` must not be used by anything
    /// else for as long as the backend exists.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn regs(&self) -> &RegisterBlock {
        // SAFETY: `new` hands us exclusive use of the peripheral.
        unsafe { &*hal::pac::TC1::ptr() }
    }
}

// Only channel 0 exists. The driver never passes another id, and the 16-bit
// registers are only touched inside critical sections so the shared TEMP
// byte is never clobbered by an interrupt.
impl TimerBackend for Tc1 {
    fn configure(&self, _id: TimerId, frequency: Frequency) -> Result<()> {
        match frequency {
            Frequency::Khz32 => {
                let p = self.regs();
                // Normal mode, no output compare pins.
                p.tccr1a.reset();
                p.tcnt1.write(|w| unsafe { w.bits(0) });
                // Clock on rising edges of T1.
                p.tccr1b.write(|w| w.cs1().ext_rising());
                Ok(())
            }
            Frequency::Ms1 => Err(TimerError::UnsupportedFrequency),
        }
    }

    fn counter(&self, _id: TimerId) -> Tick {
        self.regs().tcnt1.read().bits()
    }

    fn clear_counter(&self, _id: TimerId) {
        self.regs().tcnt1.write(|w| unsafe { w.bits(0) });
    }

    fn set_compare(&self, _id: TimerId, tick: Tick) {
        self.regs().ocr1a.write(|w| unsafe { w.bits(tick) });
    }

    fn set_interrupt_enabled(&self, _id: TimerId, line: Line, enabled: bool) {
        // TIMSK also holds the TC0 enables.
        self.regs().timsk.modify(|_, w| match line {
            Line::Compare => w.ocie1a().bit(enabled),
            Line::Overflow => w.toie1().bit(enabled),
        });
    }

    fn is_interrupt_enabled(&self, _id: TimerId, line: Line) -> bool {
        let timsk = self.regs().timsk.read();
        match line {
            Line::Compare => timsk.ocie1a().bit_is_set(),
            Line::Overflow => timsk.toie1().bit_is_set(),
        }
    }

    fn is_flag_set(&self, _id: TimerId, line: Line) -> bool {
        let tifr = self.regs().tifr.read();
        match line {
            Line::Compare => tifr.ocf1a().bit_is_set(),
            Line::Overflow => tifr.tov1().bit_is_set(),
        }
    }

    fn clear_flag(&self, _id: TimerId, line: Line) {
        // Flags clear by writing a one; zeroes leave the other flags alone.
        self.regs().tifr.write(|w| match line {
            Line::Compare => w.ocf1a().set_bit(),
            Line::Overflow => w.tov1().set_bit(),
        });
    }
}
