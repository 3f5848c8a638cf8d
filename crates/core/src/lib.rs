// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod audio;
pub mod bridge;
pub mod components;
pub mod connection;
pub mod drivers;
pub mod memory;
pub mod peripherals;
pub mod pins;
pub mod router;
pub mod shift_register;
pub mod signals;
pub mod system;
pub mod tone;

use std::rc::Rc;


pub use bridge::{connect, connect_diagram, decode_shift_register, BridgeConnections};
pub use signals::{DigitalLevel, PinState, Port};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Callback invoked on every port register write with `(new, old)` values.
pub type PortListener = Box<dyn FnMut(u8, u8)>;

/// Token returned by [`IoPort::subscribe`], used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// One 8-bit I/O port of the simulated microcontroller.
///
/// All methods take `&self`: listeners run inside the simulation's write path
/// and may call back into the port (or a sibling port) while it is notifying.
pub trait IoPort {
    fn port(&self) -> Port;
    /// Current value of the output (PORTx) register.
    fn read(&self) -> u8;
    fn pin_state(&self, bit: u8) -> PinState;
    fn subscribe(&self, listener: PortListener) -> ListenerId;
    /// Returns false when `id` is not (or no longer) subscribed.
    fn unsubscribe(&self, id: ListenerId) -> bool;
    /// Drive the external level of a pin, as a physical switch or pull-up would.
    fn force_set_pin(&self, bit: u8, level: bool);
}

/// Read access to the data space, by absolute address.
pub trait RegisterSpace {
    fn read_register(&self, addr: u16) -> u8;
}

/// The running microcontroller simulation as seen by the bridge.
pub trait Simulation {
    fn port(&self, port: Port) -> Option<Rc<dyn IoPort>>;
    fn registers(&self) -> Rc<dyn RegisterSpace>;
}
