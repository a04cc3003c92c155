//! Errors returned by the timer driver.

use core::fmt;

use nano_fmt::{NanoDisplay, NanoWrite};

/// Result type for timer operations.
pub type Result<T> = core::result::Result<T, TimerError>;

/// Reasons a timer operation was rejected.
///
/// A rejected operation never changes driver or register state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// Timer id is not below [`HWTIMER_NUM`](crate::HWTIMER_NUM).
    IdOutOfRange,
    /// The channel has not been initialized.
    NotInitialized,
    /// The channel was initialized before.
    AlreadyConfigured,
    /// The backend cannot run the channel at the requested rate.
    UnsupportedFrequency,
}

impl TimerError {
    /// Short error mnemonic, suitable for serial output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IdOutOfRange => "ESIZE",
            Self::NotInitialized => "EOFF",
            Self::AlreadyConfigured => "EALREADY",
            Self::UnsupportedFrequency => "EINVAL",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::IdOutOfRange => "timer id out of range",
            Self::NotInitialized => "timer not initialized",
            Self::AlreadyConfigured => "timer already configured",
            Self::UnsupportedFrequency => "unsupported timer frequency",
        }
    }
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl NanoDisplay for TimerError {
    fn fmt<F: NanoWrite>(self, f: &mut F) {
        self.name().fmt(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buf(Vec<u8>);

    impl NanoWrite for Buf {
        fn write_byte(&mut self, b: u8) {
            self.0.push(b);
        }
    }

    #[test]
    fn nano_display_writes_mnemonic() {
        let mut buf = Buf(Vec::new());
        TimerError::AlreadyConfigured.fmt(&mut buf);
        assert_eq!(buf.0, b"EALREADY");
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            TimerError::NotInitialized.to_string(),
            "timer not initialized"
        );
    }
}
