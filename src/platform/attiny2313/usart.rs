use nano_fmt::NanoWrite;

use super::BoardClock;
use crate::hal::{
    pac::USART,
    port::{self, PD0, PD1},
};

type Baudrate = avr_hal_generic::usart::Baudrate<BoardClock>;

/// Transmit-only USART used for status reports.
pub struct Usart0 {
    p: USART,
}

impl Usart0 {
    /// Create new instance from raw hardware.
    #[must_use]
    pub fn new<IMODE: port::mode::InputMode>(
        p: USART,
        _rx: port::Pin<port::mode::Input<IMODE>, PD0>,
        _tx: port::Pin<port::mode::Output, PD1>,
        baudrate: u32,
    ) -> Self {
        let baudrate = Baudrate::new(baudrate);
        p.ubrrh.write(|w| w.bits((baudrate.ubrr >> 8) as u8));
        p.ubrrl.write(|w| w.bits((baudrate.ubrr & 0xFF) as u8));
        p.ucsra.write(|w| w.u2x().bit(baudrate.u2x));

        // Reports only go out; the receiver stays off.
        p.ucsrb.write(|w| w.txen().set_bit());

        Self { p }
    }

    /// Send CR LF.
    pub fn newline(&mut self) {
        self.write_bytes(b"\r\n");
    }
}

impl NanoWrite for Usart0 {
    fn write_byte(&mut self, b: u8) {
        while self.p.ucsra.read().udre().bit_is_clear() {}

        self.p.udr.write(|w| w.bits(b));
    }
}
