// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::fmt;
use wirebridge_config::PortName;

/// Represents a digital signal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigitalLevel {
    #[default]
    Low,
    High,
}

impl From<bool> for DigitalLevel {
    fn from(b: bool) -> Self {
        if b {
            DigitalLevel::High
        } else {
            DigitalLevel::Low
        }
    }
}

impl From<DigitalLevel> for bool {
    fn from(level: DigitalLevel) -> Self {
        match level {
            DigitalLevel::High => true,
            DigitalLevel::Low => false,
        }
    }
}

impl fmt::Display for DigitalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigitalLevel::High => f.write_str("HIGH"),
            DigitalLevel::Low => f.write_str("LOW"),
        }
    }
}

/// Electrical state of a single port pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PinState {
    Low,
    High,
    Input,
    InputPullUp,
}

/// The three 8-bit I/O ports of the ATmega328P.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum Port {
    B,
    C,
    D,
}

impl Port {
    pub const ALL: [Port; 3] = [Port::B, Port::C, Port::D];

    pub fn letter(self) -> char {
        match self {
            Port::B => 'B',
            Port::C => 'C',
            Port::D => 'D',
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PORT{}", self.letter())
    }
}

impl From<PortName> for Port {
    fn from(name: PortName) -> Self {
        match name {
            PortName::B => Port::B,
            PortName::C => Port::C,
            PortName::D => Port::D,
        }
    }
}
