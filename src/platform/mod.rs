//! Timer backends shipped with the crate.

#[cfg(not(target_arch = "avr"))]
pub mod sim;

cfg_if::cfg_if! {
    if #[cfg(feature = "attiny2313")] {
        pub mod attiny2313;

        pub use attiny2313::PLATFORM_NUM_TIMERS;

        /// Backend of the selected platform.
        pub type Backend = attiny2313::Tc1;
    } else if #[cfg(target_arch = "avr")] {
        compile_error!("AVR builds need a board feature such as `attiny2313`");
    } else {
        /// Number of simulated channels.
        pub const PLATFORM_NUM_TIMERS: usize = 4;

        /// Backend of the selected platform.
        pub type Backend = sim::SimBackend<PLATFORM_NUM_TIMERS>;
    }
}
