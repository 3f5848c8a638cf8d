// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Recover the square-wave frequency a timer produces in CTC mode.

use crate::peripherals::timer::{Tccr2a, Tccr2b, ToneTimer};
use crate::RegisterSpace;

/// Crystal frequency of the Arduino Uno.
pub const F_CPU: u32 = 16_000_000;

/// Waveform generation mode 2: clear timer on compare match.
pub const WGM_CTC: u8 = 0b010;

/// Divisors selected by CS22..CS20. Code 0 stops the timer.
pub const PRESCALERS: [u32; 8] = [0, 1, 8, 32, 64, 128, 256, 1024];

/// Timer registers captured at the moment of a tone query. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerSnapshot {
    pub control_a: u8,
    pub control_b: u8,
    pub compare: u8,
}

impl TimerSnapshot {
    pub fn capture(registers: &dyn RegisterSpace, timer: &ToneTimer) -> Self {
        Self {
            control_a: registers.read_register(timer.control_a),
            control_b: registers.read_register(timer.control_b),
            compare: registers.read_register(timer.compare),
        }
    }

    /// WGM22 from control B lands in bit 2, WGM21:0 from control A in bits 1:0.
    pub fn waveform_mode(&self) -> u8 {
        let a = Tccr2a::from_bits_truncate(self.control_a) & Tccr2a::WGM_MASK;
        let b = Tccr2b::from_bits_truncate(self.control_b) & Tccr2b::WGM22;
        (b.bits() >> 1) | a.bits()
    }

    pub fn clock_select(&self) -> u8 {
        (Tccr2b::from_bits_truncate(self.control_b) & Tccr2b::CS_MASK).bits()
    }

    pub fn prescaler(&self) -> u32 {
        PRESCALERS[self.clock_select() as usize]
    }
}

/// Tone frequency in Hz at the Uno's 16 MHz clock, or 0 when the timer is not
/// generating one.
pub fn extract_frequency(snapshot: &TimerSnapshot) -> u32 {
    extract_frequency_at(snapshot, F_CPU)
}

/// `round(cpu_hz / (2 * prescaler * (compare + 1)))`, or 0 when the timer is
/// not in CTC mode, is stopped, or has a zero compare value.
pub fn extract_frequency_at(snapshot: &TimerSnapshot, cpu_hz: u32) -> u32 {
    if snapshot.waveform_mode() != WGM_CTC {
        return 0;
    }

    let prescaler = snapshot.prescaler();
    if prescaler == 0 || snapshot.compare == 0 {
        return 0;
    }

    let divisor = 2.0 * prescaler as f64 * (snapshot.compare as f64 + 1.0);
    (cpu_hz as f64 / divisor).round() as u32
}
