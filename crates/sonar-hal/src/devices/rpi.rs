//! Raspberry Pi GPIO backend built on `rppal`.
//!
//! Edge timestamps are captured in the interrupt callback with
//! [`Instant::now`], which is the closest a userspace driver gets to the
//! actual transition.

use crate::traits::gpio::{EchoLine, EdgeHandler, Level, TriggerLine};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use std::time::Instant;
use tracing::debug;

/// BCM pin the trigger line defaults to.
pub const DEFAULT_TRIGGER_PIN: u8 = 23;
/// BCM pin the echo line defaults to.
pub const DEFAULT_ECHO_PIN: u8 = 24;

/// Acquire the trigger/echo pair on the given BCM pins.
///
/// The trigger pin is driven low immediately so the sensor sees a defined
/// idle level.
pub fn open(trigger_pin: u8, echo_pin: u8) -> Result<(RpiTriggerLine, RpiEchoLine), rppal::gpio::Error> {
    let gpio = Gpio::new()?;
    let mut trigger = gpio.get(trigger_pin)?.into_output();
    trigger.set_low();
    let echo = gpio.get(echo_pin)?.into_input();
    debug!(trigger_pin, echo_pin, "raspberry pi gpio lines acquired");
    Ok((RpiTriggerLine { pin: trigger }, RpiEchoLine { pin: echo }))
}

/// Acquire the trigger/echo pair on the default pins (23/24).
pub fn open_default() -> Result<(RpiTriggerLine, RpiEchoLine), rppal::gpio::Error> {
    open(DEFAULT_TRIGGER_PIN, DEFAULT_ECHO_PIN)
}

fn level_from(level: rppal::gpio::Level) -> Level {
    match level {
        rppal::gpio::Level::Low => Level::Low,
        rppal::gpio::Level::High => Level::High,
    }
}

/// Trigger line on a Raspberry Pi GPIO output pin.
pub struct RpiTriggerLine {
    pin: OutputPin,
}

impl TriggerLine for RpiTriggerLine {
    type Error = rppal::gpio::Error;

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low();
        Ok(())
    }
}

/// Echo line on a Raspberry Pi GPIO input pin.
pub struct RpiEchoLine {
    pin: InputPin,
}

impl EchoLine for RpiEchoLine {
    type Error = rppal::gpio::Error;

    fn read_level(&self) -> Result<Level, Self::Error> {
        Ok(level_from(self.pin.read()))
    }

    fn set_edge_handler(&mut self, mut handler: EdgeHandler) -> Result<(), Self::Error> {
        self.pin.set_async_interrupt(Trigger::Both, move |level| {
            handler(level_from(level), Instant::now());
        })
    }

    fn clear_edge_handler(&mut self) -> Result<(), Self::Error> {
        self.pin.clear_async_interrupt()
    }
}
