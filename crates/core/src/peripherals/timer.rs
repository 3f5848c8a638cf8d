// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use bitflags::bitflags;

bitflags! {
    /// TCCR2A: Timer/Counter2 Control Register A
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Tccr2a: u8 {
        const WGM20 = 1 << 0;
        const WGM21 = 1 << 1;
        const COM2B0 = 1 << 4;
        const COM2B1 = 1 << 5;
        const COM2A0 = 1 << 6;
        const COM2A1 = 1 << 7;
    }
}

bitflags! {
    /// TCCR2B: Timer/Counter2 Control Register B
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Tccr2b: u8 {
        const CS20 = 1 << 0;
        const CS21 = 1 << 1;
        const CS22 = 1 << 2;
        const WGM22 = 1 << 3;
        const FOC2B = 1 << 6;
        const FOC2A = 1 << 7;
    }
}

impl Tccr2a {
    pub const WGM_MASK: Self = Self::WGM20.union(Self::WGM21);
}

impl Tccr2b {
    pub const CS_MASK: Self = Self::CS20.union(Self::CS21).union(Self::CS22);
}

/// Data-space addresses of the registers that define a timer's tone output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneTimer {
    pub control_a: u16,
    pub control_b: u16,
    pub counter: u16,
    pub compare: u16,
}

/// Timer2, the 8-bit timer Arduino's `tone()` programs on the Uno.
pub const TIMER2: ToneTimer = ToneTimer {
    control_a: 0xB0,
    control_b: 0xB1,
    counter: 0xB2,
    compare: 0xB3,
};

impl ToneTimer {
    /// Register writes that put the timer in clear-on-compare-match mode with
    /// the given clock select and compare value, in the order firmware does it.
    pub fn ctc_writes(&self, clock_select: u8, compare: u8) -> [(u16, u8); 4] {
        let cs = Tccr2b::from_bits_truncate(clock_select) & Tccr2b::CS_MASK;
        [
            (self.control_a, Tccr2a::WGM21.bits()),
            (self.control_b, cs.bits()),
            (self.counter, 0),
            (self.compare, compare),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctc_writes() {
        let writes = TIMER2.ctc_writes(2, 124);
        assert_eq!(writes[0], (0xB0, 0b0000_0010));
        assert_eq!(writes[1], (0xB1, 0b0000_0010));
        assert_eq!(writes[3], (0xB3, 124));
    }

    #[test]
    fn test_clock_select_is_masked() {
        let writes = TIMER2.ctc_writes(0xFF, 1);
        assert_eq!(writes[1].1, 0b0000_0111);
    }
}
