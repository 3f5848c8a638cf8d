// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Per-kind behaviour that turns a port bit into a component effect.

pub mod input;
pub mod output;

pub use input::ButtonBinding;
pub use output::{BuzzerDriver, LedDriver, OutputDriver, ToneSettings};

/// One port register write, as seen by every component on that port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortEvent {
    pub value: u8,
    pub previous: u8,
}

impl PortEvent {
    pub fn new(value: u8, previous: u8) -> Self {
        Self { value, previous }
    }

    pub fn level(&self, bit: u8) -> bool {
        self.value & (1 << (bit & 7)) != 0
    }

    pub fn changed(&self, bit: u8) -> bool {
        (self.value ^ self.previous) & (1 << (bit & 7)) != 0
    }

    pub fn rising(&self, bit: u8) -> bool {
        self.changed(bit) && self.level(bit)
    }
}
