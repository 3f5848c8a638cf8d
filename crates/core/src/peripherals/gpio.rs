// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::DataSpace;
use crate::{IoPort, ListenerId, PinState, Port, PortListener, SimResult};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Data-space addresses of one port's register triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PortRegisterLayout {
    pub pin: u16,
    pub ddr: u16,
    pub port: u16,
}

impl PortRegisterLayout {
    pub const fn for_port(port: Port) -> Self {
        match port {
            Port::B => Self {
                pin: 0x23,
                ddr: 0x24,
                port: 0x25,
            },
            Port::C => Self {
                pin: 0x26,
                ddr: 0x27,
                port: 0x28,
            },
            Port::D => Self {
                pin: 0x29,
                ddr: 0x2A,
                port: 0x2B,
            },
        }
    }

    pub fn contains(&self, addr: u16) -> bool {
        addr == self.pin || addr == self.ddr || addr == self.port
    }
}

type SharedListener = Rc<RefCell<PortListener>>;

/// AVR GPIO port backed by the shared data space.
///
/// PORTx writes notify listeners with `(new, old)` in subscription order.
/// Writing a one to a PINx bit toggles the matching PORTx bit.
///
/// A write made from inside a listener dispatches to every live listener
/// except the ones still running further up the stack.
pub struct AvrPort {
    id: Port,
    layout: PortRegisterLayout,
    data: Rc<DataSpace>,
    // Levels driven from outside the chip (buttons, pull-ups).
    external: Cell<u8>,
    listeners: RefCell<Vec<(ListenerId, SharedListener)>>,
    next_id: Cell<u64>,
}

impl std::fmt::Debug for AvrPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvrPort")
            .field("id", &self.id)
            .field("layout", &self.layout)
            .field("external", &self.external.get())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl AvrPort {
    pub fn new(id: Port, data: Rc<DataSpace>) -> Self {
        Self {
            id,
            layout: PortRegisterLayout::for_port(id),
            data,
            external: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn layout(&self) -> PortRegisterLayout {
        self.layout
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn reg(&self, addr: u16) -> u8 {
        self.data.read_u8(addr).unwrap_or(0)
    }

    pub fn ddr(&self) -> u8 {
        self.reg(self.layout.ddr)
    }

    pub fn pin_register(&self) -> u8 {
        self.reg(self.layout.pin)
    }

    /// Handle a CPU write to one of this port's registers.
    pub fn write_reg(&self, addr: u16, value: u8) -> SimResult<()> {
        if addr == self.layout.port {
            self.write_port(value)
        } else if addr == self.layout.ddr {
            self.data.write_u8(self.layout.ddr, value)?;
            self.update_pin_register()
        } else if addr == self.layout.pin {
            let toggled = self.read() ^ value;
            self.write_port(toggled)
        } else {
            self.data.write_u8(addr, value)
        }
    }

    fn write_port(&self, value: u8) -> SimResult<()> {
        let old = self.read();
        self.data.write_u8(self.layout.port, value)?;
        self.update_pin_register()?;
        self.notify(value, old);
        Ok(())
    }

    fn update_pin_register(&self) -> SimResult<()> {
        let ddr = self.ddr();
        let pin = (self.read() & ddr) | (self.external.get() & !ddr);
        self.data.write_u8(self.layout.pin, pin)
    }

    fn is_live(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|(lid, _)| *lid == id)
    }

    fn notify(&self, value: u8, old: u8) {
        // Snapshot so listeners may (un)subscribe while we iterate.
        let snapshot: Vec<(ListenerId, SharedListener)> = self.listeners.borrow().clone();

        for (id, cell) in snapshot {
            if !self.is_live(id) {
                continue;
            }
            // Already borrowed: the listener is the writer of a nested dispatch.
            let Ok(mut listener) = cell.try_borrow_mut() else {
                continue;
            };
            (*listener)(value, old);
        }
    }
}

impl IoPort for AvrPort {
    fn port(&self) -> Port {
        self.id
    }

    fn read(&self) -> u8 {
        self.reg(self.layout.port)
    }

    fn pin_state(&self, bit: u8) -> PinState {
        let mask = 1u8 << (bit & 7);
        let port = self.read() & mask != 0;
        if self.ddr() & mask != 0 {
            if port {
                PinState::High
            } else {
                PinState::Low
            }
        } else if port {
            PinState::InputPullUp
        } else {
            PinState::Input
        }
    }

    fn subscribe(&self, listener: PortListener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(listener))));
        id
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|(lid, _)| *lid == id) {
            Some(idx) => {
                listeners.remove(idx);
                true
            }
            None => false,
        }
    }

    fn force_set_pin(&self, bit: u8, level: bool) {
        let mask = 1u8 << (bit & 7);
        let external = if level {
            self.external.get() | mask
        } else {
            self.external.get() & !mask
        };
        self.external.set(external);
        if let Err(e) = self.update_pin_register() {
            tracing::warn!("{}: failed to update PIN register: {}", self.id, e);
        }
    }
}
