// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! One consolidated listener per port.
//!
//! Every output component wired to a port shares a single subscription. On
//! each register write the listener walks the members once, in registration
//! order, handing all of them the same `(new, old)` pair.

use crate::connection::ComponentConnection;
use crate::drivers::{OutputDriver, PortEvent};
use crate::{IoPort, ListenerId, Port};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// An output component together with the port bit it follows.
pub struct PortMember {
    pub connection: ComponentConnection,
    pub driver: OutputDriver,
}

impl PortMember {
    pub fn new(connection: ComponentConnection, driver: OutputDriver) -> Self {
        Self { connection, driver }
    }
}

/// Members grouped by the port their signal pin lives on.
#[derive(Default)]
pub struct PortGroups {
    b: Vec<PortMember>,
    c: Vec<PortMember>,
    d: Vec<PortMember>,
}

impl PortGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, member: PortMember) {
        match member.connection.port {
            Port::B => self.b.push(member),
            Port::C => self.c.push(member),
            Port::D => self.d.push(member),
        }
    }

    pub fn len(&self) -> usize {
        self.b.len() + self.c.len() + self.d.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-empty groups in port order B, C, D.
    pub fn into_groups(self) -> impl Iterator<Item = (Port, Vec<PortMember>)> {
        [(Port::B, self.b), (Port::C, self.c), (Port::D, self.d)]
            .into_iter()
            .filter(|(_, members)| !members.is_empty())
    }
}

struct PortDispatch {
    port: Port,
    members: Vec<PortMember>,
}

impl PortDispatch {
    fn dispatch(&mut self, value: u8, previous: u8) {
        let event = PortEvent::new(value, previous);
        trace!(
            "{} write {:#04x} -> {:#04x}, {} members",
            self.port,
            previous,
            value,
            self.members.len()
        );
        for member in self.members.iter_mut() {
            member.driver.update(&event, member.connection.bit);
        }
    }
}

/// Handle to one port listener. Dropping it unsubscribes.
pub struct PortSubscription {
    port: Rc<dyn IoPort>,
    id: Option<ListenerId>,
}

impl std::fmt::Debug for PortSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortSubscription")
            .field("port", &self.port.port())
            .field("id", &self.id)
            .finish()
    }
}

impl PortSubscription {
    pub fn new(port: Rc<dyn IoPort>, listener: crate::PortListener) -> Self {
        let id = port.subscribe(listener);
        Self { port, id: Some(id) }
    }

    pub fn port(&self) -> Port {
        self.port.port()
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    /// Remove the listener. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(id) = self.id.take() {
            if !self.port.unsubscribe(id) {
                debug!("{} listener {:?} already gone", self.port.port(), id);
            }
        }
    }
}

impl Drop for PortSubscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Subscribe `members` to `port` and replay the current register value to
/// them as an unchanged write, so they show boot-time state immediately.
pub fn attach(port: Rc<dyn IoPort>, members: Vec<PortMember>) -> PortSubscription {
    let port_id = port.port();
    debug!("Attaching {} components to {}", members.len(), port_id);

    let dispatch = Rc::new(RefCell::new(PortDispatch {
        port: port_id,
        members,
    }));

    let listener_dispatch = dispatch.clone();
    let subscription = PortSubscription::new(
        port.clone(),
        Box::new(move |value, previous| {
            listener_dispatch.borrow_mut().dispatch(value, previous);
        }),
    );

    let current = port.read();
    dispatch.borrow_mut().dispatch(current, current);
    subscription
}

/// Log every change of a port's output register.
pub fn trace_port(port: Rc<dyn IoPort>) -> PortSubscription {
    let port_id = port.port();
    PortSubscription::new(
        port,
        Box::new(move |value, previous| {
            if value != previous {
                debug!(
                    "{} {:#010b} -> {:#010b} (changed {:#010b})",
                    port_id,
                    previous,
                    value,
                    value ^ previous
                );
            }
        }),
    )
}
