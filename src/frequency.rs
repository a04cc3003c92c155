//! Tick-rate selectors and their rates in ticks per second.

use nano_fmt::{NanoDisplay, NanoWrite};

use crate::TimerError;

/// Raw selector for the millisecond-scale rate.
pub const FREQ_1MS: u8 = 0;
/// Ticks per second at [`FREQ_1MS`].
pub const TICKS_1MS: u32 = 1024;

/// Raw selector for the 32 kHz rate.
pub const FREQ_32K: u8 = 1;
/// Ticks per second at [`FREQ_32K`].
pub const TICKS_32K: u32 = 32768;

/// Tick rate of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Frequency {
    /// 1024 ticks per second, roughly one tick per millisecond.
    Ms1,
    /// 32768 ticks per second.
    Khz32,
}

impl Frequency {
    /// Raw selector value.
    #[must_use]
    pub const fn selector(self) -> u8 {
        match self {
            Self::Ms1 => FREQ_1MS,
            Self::Khz32 => FREQ_32K,
        }
    }

    #[must_use]
    pub const fn ticks_per_second(self) -> u32 {
        match self {
            Self::Ms1 => TICKS_1MS,
            Self::Khz32 => TICKS_32K,
        }
    }
}

impl TryFrom<u8> for Frequency {
    type Error = TimerError;

    fn try_from(selector: u8) -> Result<Self, Self::Error> {
        match selector {
            FREQ_1MS => Ok(Self::Ms1),
            FREQ_32K => Ok(Self::Khz32),
            _ => Err(TimerError::UnsupportedFrequency),
        }
    }
}

impl NanoDisplay for Frequency {
    fn fmt<F: NanoWrite>(self, f: &mut F) {
        let name = match self {
            Self::Ms1 => "1ms",
            Self::Khz32 => "32k",
        };
        name.fmt(f);
    }
}
