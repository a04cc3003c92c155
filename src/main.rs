#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

use core::{cell::RefCell, convert::Infallible};

use critical_section::{CriticalSection, Mutex};
use embedded_hal::digital::StatefulOutputPin;
use nano_fmt::NanoDisplay;
use panic_halt as _;

use hwtimer::{
    Event, Frequency, TICKS_32K, Tick, TimerId, Timers,
    hal::{self, prelude::*},
    platform::attiny2313::{BoardClock, Tc1, Usart0},
};

type Delay = hal::delay::Delay<BoardClock>;

/// UART baud rate.
const BAUDRATE: u32 = 9600;

/// Channel driven by `TC1`.
const TIMER: TimerId = 0;

/// One second at the 32 kHz rate.
const PERIOD: Tick = TICKS_32K as Tick;

// SAFETY: TC1 is only touched through this driver.
static TIMERS: Timers = Timers::new(unsafe { Tc1::new() });

/// Data shared between the timer callbacks and the main loop.
struct SharedData {
    /// Seconds counted by the compare callback.
    seconds: u16,
    /// Counter wraparounds seen by the overflow callback.
    overflows: u16,
    /// Set when the next compare could not be armed.
    fault: bool,
    /// Flag that tells main loop when 1 second has passed.
    tick: bool,
}

impl SharedData {
    pub const fn new() -> Self {
        Self {
            seconds: 0,
            overflows: 0,
            fault: false,
            tick: false,
        }
    }
}

static SHARED_DATA: Mutex<RefCell<SharedData>> = Mutex::new(RefCell::new(SharedData::new()));

/// Compare callback, runs once a second and arms the next second.
fn on_second() {
    let rearmed = TIMERS.schedule_after(TIMER, PERIOD).is_ok();

    critical_section::with(|cs| {
        let mut shared = SHARED_DATA.borrow_ref_mut(cs);
        shared.seconds = shared.seconds.wrapping_add(1);
        shared.tick = true;
        shared.fault |= !rearmed;
    });
}

/// Overflow callback, runs every two seconds at 32 kHz.
fn on_overflow() {
    critical_section::with(|cs| {
        let mut shared = SHARED_DATA.borrow_ref_mut(cs);
        shared.overflows = shared.overflows.wrapping_add(1);
    });
}

/// TIMER1 compare match A.
#[avr_device::interrupt(attiny2313)]
fn TIMER1_COMPA() {
    // SAFETY: We are inside a blocking interrupt.
    let cs = unsafe { CriticalSection::new() };
    TIMERS.on_interrupt(cs, TIMER, Event::Compare);
}

/// TIMER1 overflow.
#[avr_device::interrupt(attiny2313)]
fn TIMER1_OVF() {
    // SAFETY: We are inside a blocking interrupt.
    let cs = unsafe { CriticalSection::new() };
    TIMERS.on_interrupt(cs, TIMER, Event::Overflow);
}

fn blink<P: StatefulOutputPin<Error = Infallible>>(led: &mut P) {
    let Ok(()) = led.toggle();
}

/// Log data over the serial port.
fn send_report(serial: &mut Usart0) {
    let report = critical_section::with(|cs| {
        let mut shared = SHARED_DATA.borrow_ref_mut(cs);
        if core::mem::replace(&mut shared.tick, false) {
            Some((shared.seconds, shared.overflows, shared.fault))
        } else {
            None
        }
    });

    if let Some((seconds, overflows, fault)) = report {
        "T, ".fmt(serial);
        seconds.fmt(serial);
        ", OVF, ".fmt(serial);
        overflows.fmt(serial);
        ", CNT, ".fmt(serial);
        TIMERS.read(TIMER).fmt(serial);
        if fault {
            ", FAULT".fmt(serial);
        }
        serial.newline();
    }
}

#[hal::entry]
fn main() -> ! {
    // Nothing else takes the peripherals, so this cannot fail.
    let Some(dp) = hal::Peripherals::take() else {
        loop {}
    };
    let pins = hal::pins!(dp);

    let mut serial = Usart0::new(
        dp.USART,
        pins.pd0.into_pull_up_input(),
        pins.pd1.into_output(),
        BAUDRATE,
    );

    let mut led = pins.pb4.into_output();
    // External 32.768 kHz clock input.
    let _t1 = pins.pd5.into_floating_input();

    "hwtimer demo".fmt(&mut serial);
    serial.newline();

    // The crystal needs a moment to start oscillating.
    Delay::new().delay_ms(100u16);

    let started = TIMERS
        .initialize(TIMER, Frequency::Khz32, Some(on_second), Some(on_overflow))
        .and_then(|()| TIMERS.schedule_after(TIMER, PERIOD));

    if let Err(err) = started {
        "init failed: ".fmt(&mut serial);
        err.fmt(&mut serial);
        serial.newline();
        loop {}
    }

    unsafe {
        // SAFETY: Not inside a critical section and any non-atomic operations have been completed
        // at this point.
        avr_device::interrupt::enable();
    }

    loop {
        // Set sleep mode to IDLE and enable sleep.
        dp.CPU.mcucr.modify(|_, w| w.sm().idle().se().set_bit());
        // Go to sleep until next interrupt.
        avr_device::asm::sleep();
        // Disable sleep so we don't accidentally go to  sleep.
        dp.CPU.mcucr.modify(|_, w| w.se().clear_bit());

        if critical_section::with(|cs| SHARED_DATA.borrow_ref(cs).tick) {
            blink(&mut led);
        }
        send_report(&mut serial);
    }
}
