// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Wiring a running simulation to rendered components, and tearing it down.

use crate::audio::BuzzerAudio;
use crate::components::{ComponentCategory, ComponentKind, ComponentSet, ElementHandle};
use crate::connection::{
    extract_connections, group_by_component, select_signal_connection, ComponentConnection,
};
use crate::drivers::{ButtonBinding, BuzzerDriver, LedDriver, OutputDriver, ToneSettings};
use crate::router::{attach, trace_port, PortGroups, PortMember, PortSubscription};
use crate::shift_register::ShiftRegisterDecoder;
use crate::{Port, Simulation};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};
use wirebridge_config::{BridgeConfig, Diagram, ShiftRegisterPins, SHIFT_REGISTER_PART};

/// Everything a connected simulation holds on to.
///
/// `cleanup` removes every port listener, detaches every button and releases
/// the audio device. It runs at most once and is also invoked on drop.
#[derive(Debug, Default)]
pub struct BridgeConnections {
    subscriptions: Vec<PortSubscription>,
    bindings: Vec<ButtonBinding>,
    audio: Vec<Rc<RefCell<BuzzerAudio>>>,
    cleaned: bool,
}

impl BridgeConnections {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Take over everything `other` holds; one cleanup then tears down both.
    /// Merging into an already cleaned-up set tears `other` down at once.
    pub fn merge(&mut self, mut other: BridgeConnections) {
        self.subscriptions
            .append(&mut std::mem::take(&mut other.subscriptions));
        self.bindings.append(&mut std::mem::take(&mut other.bindings));
        self.audio.append(&mut std::mem::take(&mut other.audio));

        if self.cleaned {
            self.cleaned = false;
            self.cleanup();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cleaned
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn button_count(&self) -> usize {
        self.bindings.len()
    }

    /// Frequency currently played by the buzzer audio, if any.
    pub fn tone_hz(&self) -> Option<u32> {
        self.audio.iter().find_map(|a| a.borrow().current_tone())
    }

    pub fn cleanup(&mut self) {
        if self.cleaned {
            debug!("Bridge cleanup: already done");
            return;
        }
        self.cleaned = true;

        for subscription in self.subscriptions.iter_mut() {
            subscription.dispose();
        }
        for binding in self.bindings.iter_mut() {
            binding.unbind();
        }
        for audio in &self.audio {
            if !audio.borrow_mut().release() {
                debug!("Bridge cleanup: audio already released");
            }
        }

        debug!(
            "Bridge cleanup: {} listeners, {} buttons",
            self.subscriptions.len(),
            self.bindings.len()
        );
        self.subscriptions.clear();
        self.bindings.clear();
    }
}

impl Drop for BridgeConnections {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Attach rendered components to the simulation's ports.
///
/// Output components share one listener per port; buttons drive their pin
/// directly. Components without a usable signal pin are logged and skipped.
pub fn connect(
    sim: &dyn Simulation,
    components: &ComponentSet,
    connections: &[ComponentConnection],
    mut audio: BuzzerAudio,
    config: &BridgeConfig,
) -> BridgeConnections {
    audio.set_volume(config.volume);
    let audio = Rc::new(RefCell::new(audio));
    let settings = ToneSettings::from(config);
    let registers = sim.registers();

    let mut groups = PortGroups::new();
    let mut bindings = Vec::new();

    for (id, wires) in group_by_component(connections) {
        let Some(component) = components.get(id) else {
            warn!("No rendered component for {}, skipping", id);
            continue;
        };
        let kind = component.kind;
        let element = component.element.clone();

        match kind.category() {
            ComponentCategory::Output => {
                let Some(conn) = select_signal_connection(&wires, kind.signal_pins()) else {
                    warn!("{:?} {} has no signal connection", kind, id);
                    continue;
                };
                let driver = match kind {
                    ComponentKind::Led => OutputDriver::Led(LedDriver::new(id, element)),
                    ComponentKind::Buzzer => OutputDriver::Buzzer(BuzzerDriver::new(
                        id,
                        element,
                        audio.clone(),
                        registers.clone(),
                        settings,
                    )),
                    _ => continue,
                };
                debug!(
                    "Connecting {:?} {} to pin {} ({} bit {})",
                    kind, id, conn.arduino_pin, conn.port, conn.bit
                );
                groups.push(PortMember::new(conn.clone(), driver));
            }
            ComponentCategory::Input => {
                let Some(conn) = select_signal_connection(&wires, kind.signal_pins()) else {
                    warn!("Button {} has no signal connection", id);
                    continue;
                };
                match sim.port(conn.port) {
                    Some(port) => bindings.push(ButtonBinding::bind(id, element, port, conn)),
                    None => warn!("{} not available for button {}", conn.port, id),
                }
            }
            ComponentCategory::Display => {
                debug!("Display {} is driven through the shift register", id);
            }
            ComponentCategory::Special => {
                debug!("Special component {} has no direct driver", id);
            }
            ComponentCategory::Unsupported => {
                debug!("Unsupported component {} ignored", id);
            }
        }
    }

    let mut subscriptions = Vec::new();
    for (port_id, members) in groups.into_groups() {
        match sim.port(port_id) {
            Some(port) => subscriptions.push(attach(port, members)),
            None => warn!(
                "{} not available, {} components left unconnected",
                port_id,
                members.len()
            ),
        }
    }

    if config.trace_ports {
        for port_id in Port::ALL {
            if let Some(port) = sim.port(port_id) {
                subscriptions.push(trace_port(port));
            }
        }
    }

    info!(
        "Bridge connected {} components: {} port listeners, {} buttons",
        components.len(),
        subscriptions.len(),
        bindings.len()
    );

    BridgeConnections {
        subscriptions,
        bindings,
        audio: vec![audio],
        cleaned: false,
    }
}

/// Decode a serial data/clock/latch triple on port C into the first two
/// seven-segment displays: the first shows the ones digit, the second the tens.
pub fn decode_shift_register(
    sim: &dyn Simulation,
    components: &ComponentSet,
    pins: ShiftRegisterPins,
) -> BridgeConnections {
    let displays: Vec<ElementHandle> = components
        .of_kind(ComponentKind::SevenSegment)
        .map(|c| c.element.clone())
        .collect();
    if displays.is_empty() {
        debug!("No seven-segment displays, shift register not decoded");
        return BridgeConnections::empty();
    }

    let Some(port) = sim.port(Port::C) else {
        warn!("PORTC not available, shift register not decoded");
        return BridgeConnections::empty();
    };

    debug!(
        "Decoding shift register on PORTC (data {}, clock {}, latch {}) into {} displays",
        pins.data_bit,
        pins.clock_bit,
        pins.latch_bit,
        displays.len()
    );

    let mut decoder = ShiftRegisterDecoder::new(pins);
    let subscription = PortSubscription::new(
        port,
        Box::new(move |value, _| {
            let Some(frame) = decoder.step(value) else {
                return;
            };
            if let Some(ones) = displays.first() {
                ones.borrow_mut().set_digit(frame.ones);
            }
            if let Some(tens) = displays.get(1) {
                tens.borrow_mut().set_digit(frame.tens);
            }
        }),
    );

    let mut bridge = BridgeConnections::empty();
    bridge.subscriptions.push(subscription);
    bridge
}

/// Connect everything a diagram wires to the board, adding the shift-register
/// decoder when the diagram carries a 74HC595 and the config allows it.
pub fn connect_diagram(
    sim: &dyn Simulation,
    components: &ComponentSet,
    diagram: &Diagram,
    audio: BuzzerAudio,
    config: &BridgeConfig,
) -> BridgeConnections {
    let connections = extract_connections(&diagram.connections);
    debug!(
        "Diagram: {} parts, {} wires, {} board connections",
        diagram.parts.len(),
        diagram.connections.len(),
        connections.len()
    );

    let mut bridge = connect(sim, components, &connections, audio, config);
    if config.auto_shift_register && diagram.has_part_type(SHIFT_REGISTER_PART) {
        bridge.merge(decode_shift_register(sim, components, config.shift_register));
    }
    bridge
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_support::{RecordingSink, SinkEvent};
    use crate::components::VirtualElement;
    use crate::shift_register::clock_out_sequence;
    use crate::system::atmega328p::AvrIo;
    use wirebridge_config::RawConnection;

    fn wire(source: &str, target: &str) -> ComponentConnection {
        extract_connections(&[RawConnection::new(source, target, "green")])
            .pop()
            .unwrap()
    }

    #[test]
    fn test_unknown_component_is_skipped() {
        let io = AvrIo::new();
        let mut components = ComponentSet::new();
        let led = VirtualElement::shared();
        components.insert("led1", ComponentKind::Led, led.clone());

        let connections = [wire("uno:2", "ghost:A"), wire("uno:13", "led1:A")];
        let bridge = connect(
            &io,
            &components,
            &connections,
            BuzzerAudio::new(Box::new(RecordingSink::default())),
            &BridgeConfig::default(),
        );
        assert_eq!(bridge.subscription_count(), 1);

        io.write_port(Port::B, 1 << 5).unwrap();
        assert!(led.borrow().lit);
    }

    #[test]
    fn test_led_without_anode_is_skipped() {
        let io = AvrIo::new();
        let mut components = ComponentSet::new();
        components.insert("led1", ComponentKind::Led, VirtualElement::shared());

        let bridge = connect(
            &io,
            &components,
            &[wire("uno:13", "led1:C")],
            BuzzerAudio::new(Box::new(RecordingSink::default())),
            &BridgeConfig::default(),
        );
        assert_eq!(bridge.subscription_count(), 0);
        assert_eq!(io.avr_port(Port::B).listener_count(), 0);
    }

    #[test]
    fn test_volume_comes_from_config() {
        let io = AvrIo::new();
        let sink = RecordingSink::default();
        let config = BridgeConfig {
            volume: 0.5,
            ..BridgeConfig::default()
        };
        let _bridge = connect(
            &io,
            &ComponentSet::new(),
            &[],
            BuzzerAudio::new(Box::new(sink.clone())),
            &config,
        );
        assert_eq!(sink.count(&SinkEvent::Volume(0.5)), 1);
    }

    #[test]
    fn test_trace_ports_adds_listeners() {
        let io = AvrIo::new();
        let config = BridgeConfig {
            trace_ports: true,
            ..BridgeConfig::default()
        };
        let mut bridge = connect(
            &io,
            &ComponentSet::new(),
            &[],
            BuzzerAudio::new(Box::new(RecordingSink::default())),
            &config,
        );
        assert_eq!(bridge.subscription_count(), 3);
        assert_eq!(io.avr_port(Port::D).listener_count(), 1);

        bridge.cleanup();
        assert_eq!(io.avr_port(Port::D).listener_count(), 0);
    }

    #[test]
    fn test_decoder_needs_displays() {
        let io = AvrIo::new();
        let bridge = decode_shift_register(&io, &ComponentSet::new(), ShiftRegisterPins::default());
        assert_eq!(bridge.subscription_count(), 0);
        assert_eq!(io.avr_port(Port::C).listener_count(), 0);
    }

    #[test]
    fn test_decoder_drives_two_displays() {
        let io = AvrIo::new();
        let mut components = ComponentSet::new();
        let ones = VirtualElement::shared();
        let tens = VirtualElement::shared();
        components.insert("sevseg1", ComponentKind::SevenSegment, ones.clone());
        components.insert("sevseg2", ComponentKind::SevenSegment, tens.clone());

        let pins = ShiftRegisterPins::default();
        let _bridge = decode_shift_register(&io, &components, pins);
        for value in clock_out_sequence(pins, 0, &[0x99, 0x82]) {
            io.write_port(Port::C, value).unwrap();
        }
        assert_eq!(ones.borrow().digit, Some(4));
        assert_eq!(tens.borrow().digit, Some(6));
    }

    #[test]
    fn test_merge_cleans_up_together() {
        let io = AvrIo::new();
        let mut components = ComponentSet::new();
        components.insert("sevseg1", ComponentKind::SevenSegment, VirtualElement::shared());
        let sink = RecordingSink::default();

        let mut bridge = connect(
            &io,
            &components,
            &[],
            BuzzerAudio::new(Box::new(sink.clone())),
            &BridgeConfig::default(),
        );
        bridge.merge(decode_shift_register(
            &io,
            &components,
            ShiftRegisterPins::default(),
        ));
        assert_eq!(bridge.subscription_count(), 1);

        drop(bridge);
        assert_eq!(io.avr_port(Port::C).listener_count(), 0);
        assert_eq!(sink.count(&SinkEvent::Close), 1);
    }
}
