// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::DataSpace;
use crate::peripherals::gpio::AvrPort;
use crate::peripherals::timer::TIMER2;
use crate::{IoPort, Port, RegisterSpace, SimResult, Simulation};
use std::rc::Rc;

/// I/O side of an ATmega328P: the data space plus GPIO ports B, C and D.
///
/// This stands in for the CPU engine: firmware effects are replayed as data
/// space writes and routed to the owning port, which notifies its listeners.
#[derive(Debug)]
pub struct AvrIo {
    data: Rc<DataSpace>,
    ports: [Rc<AvrPort>; 3],
}

impl Default for AvrIo {
    fn default() -> Self {
        Self::new()
    }
}

impl AvrIo {
    pub fn new() -> Self {
        let data = Rc::new(DataSpace::default());
        let ports = Port::ALL.map(|p| Rc::new(AvrPort::new(p, data.clone())));
        Self { data, ports }
    }

    pub fn avr_port(&self, port: Port) -> &Rc<AvrPort> {
        match port {
            Port::B => &self.ports[0],
            Port::C => &self.ports[1],
            Port::D => &self.ports[2],
        }
    }

    pub fn data(&self) -> &Rc<DataSpace> {
        &self.data
    }

    pub fn read_data(&self, addr: u16) -> SimResult<u8> {
        self.data.read_u8(addr)
    }

    pub fn write_data(&self, addr: u16, value: u8) -> SimResult<()> {
        match self.ports.iter().find(|p| p.layout().contains(addr)) {
            Some(port) => port.write_reg(addr, value),
            None => self.data.write_u8(addr, value),
        }
    }

    /// Write the PORTx output register of `port`.
    pub fn write_port(&self, port: Port, value: u8) -> SimResult<()> {
        let layout = self.avr_port(port).layout();
        self.write_data(layout.port, value)
    }

    /// Set the data direction register of `port`.
    pub fn set_ddr(&self, port: Port, value: u8) -> SimResult<()> {
        let layout = self.avr_port(port).layout();
        self.write_data(layout.ddr, value)
    }

    pub fn snapshot(&self) -> serde_json::Value {
        let ports: serde_json::Map<String, serde_json::Value> = self
            .ports
            .iter()
            .map(|p| {
                (
                    p.port().to_string(),
                    serde_json::json!({
                        "port": p.read(),
                        "ddr": p.ddr(),
                        "pin": p.pin_register(),
                    }),
                )
            })
            .collect();

        serde_json::json!({
            "ports": ports,
            "timer2": {
                "tccr2a": self.data.read_register(TIMER2.control_a),
                "tccr2b": self.data.read_register(TIMER2.control_b),
                "ocr2a": self.data.read_register(TIMER2.compare),
            },
        })
    }
}

impl Simulation for AvrIo {
    fn port(&self, port: Port) -> Option<Rc<dyn IoPort>> {
        let port: Rc<dyn IoPort> = self.avr_port(port).clone();
        Some(port)
    }

    fn registers(&self) -> Rc<dyn RegisterSpace> {
        self.data.clone()
    }
}
