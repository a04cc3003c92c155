//! Diagnostics that go to `defmt` when the feature is enabled and vanish otherwise.
//!
//! Never used on the interrupt dispatch path.

#![allow(unused_macros)]

macro_rules! trace {
    ($($arg:tt)*) => { __log!(trace, $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { __log!(debug, $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { __log!(warn, $($arg)*) };
}

#[cfg(feature = "defmt")]
macro_rules! __log {
    ($level:ident, $($arg:tt)*) => {
        defmt::$level!($($arg)*)
    };
}

// Arguments are still evaluated so they do not trip unused warnings.
#[cfg(not(feature = "defmt"))]
macro_rules! __log {
    ($level:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let _ = ($fmt, $($arg),*);
    }};
}
