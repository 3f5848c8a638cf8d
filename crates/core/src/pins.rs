// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::Port;

/// Analog pins are numbered after the digital ones (A0 = 14 .. A5 = 19).
pub const ANALOG_PIN_OFFSET: u8 = 14;
pub const DIGITAL_PIN_COUNT: u8 = 14;
pub const ANALOG_PIN_COUNT: u8 = 6;

/// Location of a board pin inside the port registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PinMapping {
    pub arduino_pin: u8,
    pub port: Port,
    pub bit: u8,
}

/// Digital pins 0-7 live on PORTD, 8-13 on PORTB.
pub fn map_digital(pin: u8) -> Option<PinMapping> {
    match pin {
        0..=7 => Some(PinMapping {
            arduino_pin: pin,
            port: Port::D,
            bit: pin,
        }),
        8..=13 => Some(PinMapping {
            arduino_pin: pin,
            port: Port::B,
            bit: pin - 8,
        }),
        _ => None,
    }
}

/// Analog pins A0-A5 live on PORTC.
pub fn map_analog(pin: u8) -> Option<PinMapping> {
    if pin < ANALOG_PIN_COUNT {
        Some(PinMapping {
            arduino_pin: pin + ANALOG_PIN_OFFSET,
            port: Port::C,
            bit: pin,
        })
    } else {
        None
    }
}

/// Map a unified pin index (0-13 digital, 14-19 analog).
pub fn map_pin_index(index: u8) -> Option<PinMapping> {
    if index < DIGITAL_PIN_COUNT {
        map_digital(index)
    } else {
        map_analog(index.checked_sub(ANALOG_PIN_OFFSET)?)
    }
}
