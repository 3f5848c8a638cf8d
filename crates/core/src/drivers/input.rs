// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::components::{ButtonEvent, ElementHandle, HandlerId};
use crate::connection::ComponentConnection;
use crate::{DigitalLevel, IoPort};
use std::rc::Rc;
use tracing::{debug, warn};

/// A push-button wired to a port pin with a pull-up: idle HIGH, pressed LOW.
///
/// Dropping the binding detaches it from the element.
#[derive(Debug)]
pub struct ButtonBinding {
    id: String,
    element: ElementHandle,
    handler: Option<HandlerId>,
}

impl ButtonBinding {
    /// Drive the pin HIGH (released) and start forwarding press events.
    pub fn bind(
        id: &str,
        element: ElementHandle,
        port: Rc<dyn IoPort>,
        connection: &ComponentConnection,
    ) -> Self {
        let bit = connection.bit;
        port.force_set_pin(bit, true);

        let label = id.to_string();
        let arduino_pin = connection.arduino_pin;
        let handler = element
            .borrow_mut()
            .add_button_listener(Box::new(move |event| {
                let was = port.pin_state(bit);
                let level = event == ButtonEvent::Release;
                port.force_set_pin(bit, level);
                debug!(
                    "Button {} {:?} - pin {} ({} bit {}) set to {} (was {:?})",
                    label,
                    event,
                    arduino_pin,
                    port.port(),
                    bit,
                    DigitalLevel::from(level),
                    was,
                );
            }));

        if handler.is_none() {
            warn!("Button {} element does not accept press listeners", id);
        } else {
            debug!(
                "Connecting button {} to pin {} ({} bit {})",
                id, connection.arduino_pin, connection.port, bit
            );
        }

        Self {
            id: id.to_string(),
            element,
            handler,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_bound(&self) -> bool {
        self.handler.is_some()
    }

    pub fn unbind(&mut self) {
        if let Some(handler) = self.handler.take() {
            self.element.borrow_mut().remove_button_listener(handler);
        }
    }
}

impl Drop for ButtonBinding {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::VirtualElement;
    use crate::system::atmega328p::AvrIo;
    use crate::{Port, Simulation};

    fn connection(bit: u8) -> ComponentConnection {
        ComponentConnection {
            component_id: "btn1".to_string(),
            component_pin: "1.l".to_string(),
            arduino_pin: bit,
            port: Port::D,
            bit,
        }
    }

    #[test]
    fn test_bind_pulls_pin_high() {
        let io = AvrIo::new();
        let element = VirtualElement::shared();
        let port = io.port(Port::D).unwrap();

        let binding = ButtonBinding::bind("btn1", element.clone(), port, &connection(2));
        assert!(binding.is_bound());
        assert_eq!(io.avr_port(Port::D).pin_register(), 0b0000_0100);
        assert_eq!(element.borrow().listener_count(), 1);
    }

    #[test]
    fn test_press_and_release_drive_pin() {
        let io = AvrIo::new();
        let element = VirtualElement::shared();
        let port = io.port(Port::D).unwrap();
        let _binding = ButtonBinding::bind("btn1", element.clone(), port, &connection(5));

        element.borrow_mut().press();
        assert_eq!(io.avr_port(Port::D).pin_register() & (1 << 5), 0);

        element.borrow_mut().release();
        assert_eq!(io.avr_port(Port::D).pin_register() & (1 << 5), 1 << 5);
    }

    #[test]
    fn test_unbind_detaches_listener() {
        let io = AvrIo::new();
        let element = VirtualElement::shared();
        let port = io.port(Port::D).unwrap();
        let mut binding = ButtonBinding::bind("btn1", element.clone(), port, &connection(2));

        binding.unbind();
        binding.unbind();
        assert!(!binding.is_bound());
        assert_eq!(element.borrow().listener_count(), 0);

        element.borrow_mut().press();
        assert_eq!(io.avr_port(Port::D).pin_register(), 0b0000_0100);
    }

    #[test]
    fn test_element_without_button_support() {
        #[derive(Debug)]
        struct Inert;
        impl crate::components::Element for Inert {}

        let io = AvrIo::new();
        let element: ElementHandle = Rc::new(std::cell::RefCell::new(Inert));
        let port = io.port(Port::B).unwrap();
        let binding = ButtonBinding::bind("btn1", element, port, &connection(0));
        assert!(!binding.is_bound());
        // Pull-up default still applies.
        assert_eq!(io.avr_port(Port::B).pin_register(), 0b0000_0001);
    }
}
