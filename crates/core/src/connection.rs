// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Typed view of the diagram wires that join a component pin to a board pin.

use crate::pins::{self, ANALOG_PIN_OFFSET};
use crate::Port;
use wirebridge_config::{RawConnection, CONTROLLER_PREFIX};

/// Board pin names that carry supply voltage rather than a logic signal.
const POWER_RAILS: [&str; 3] = ["GND", "5V", "3.3V"];

/// Why a board-side token did not yield a pin index.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PinParseError {
    #[error("'{0}' is not a controller pin")]
    NotController(String),
    #[error("'{0}' is a power rail")]
    PowerRail(String),
    #[error("'{0}' has no pin number")]
    Malformed(String),
    #[error("'{0}' is outside the mapped pin range")]
    OutOfRange(String),
}

/// A component pin wired to a board pin, resolved to its port coordinate.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ComponentConnection {
    pub component_id: String,
    /// Verbatim pin name, possibly with a side suffix such as `1.l`.
    pub component_pin: String,
    pub arduino_pin: u8,
    pub port: Port,
    pub bit: u8,
}

impl ComponentConnection {
    /// Pin name without the physical-side suffix (`1.l` -> `1`).
    pub fn pin_base(&self) -> &str {
        self.component_pin
            .split_once('.')
            .map_or(self.component_pin.as_str(), |(base, _)| base)
    }

    pub fn matches_pin(&self, name: &str) -> bool {
        self.component_pin == name || self.pin_base() == name
    }
}

/// Parse a board-side token (`uno:9`, `uno:A0`) into a unified pin index.
///
/// Analog pins are returned as `14 + n` so they never collide with digital
/// pin numbers.
pub fn parse_controller_pin(token: &str) -> Result<u8, PinParseError> {
    let Some(name) = token.strip_prefix(CONTROLLER_PREFIX) else {
        return Err(PinParseError::NotController(token.to_string()));
    };

    if POWER_RAILS.iter().any(|rail| name.contains(rail)) {
        return Err(PinParseError::PowerRail(token.to_string()));
    }

    let (analog, rest) = match name.strip_prefix('A') {
        Some(rest) => (true, rest),
        None => (false, name),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(PinParseError::Malformed(token.to_string()));
    }

    let number: u32 = rest[..digits_len]
        .parse()
        .map_err(|_| PinParseError::OutOfRange(token.to_string()))?;

    let index = if analog {
        (number < pins::ANALOG_PIN_COUNT as u32).then(|| number as u8 + ANALOG_PIN_OFFSET)
    } else {
        (number < pins::DIGITAL_PIN_COUNT as u32).then_some(number as u8)
    };

    index.ok_or_else(|| PinParseError::OutOfRange(token.to_string()))
}

/// Split `component-id:pin` at the first colon.
pub fn parse_component_pin(token: &str) -> Option<(&str, &str)> {
    let (id, pin) = token.split_once(':')?;
    if id.is_empty() || pin.is_empty() {
        return None;
    }
    Some((id, pin))
}

fn resolve(raw: &RawConnection) -> Result<ComponentConnection, PinParseError> {
    let source_is_board = raw.source.starts_with(CONTROLLER_PREFIX);
    let target_is_board = raw.target.starts_with(CONTROLLER_PREFIX);

    let (board, component) = match (source_is_board, target_is_board) {
        (true, false) => (&raw.source, &raw.target),
        (false, true) => (&raw.target, &raw.source),
        (true, true) => return Err(PinParseError::NotController(raw.target.clone())),
        (false, false) => return Err(PinParseError::NotController(raw.source.clone())),
    };

    let index = parse_controller_pin(board)?;
    let (component_id, component_pin) = parse_component_pin(component)
        .ok_or_else(|| PinParseError::Malformed(component.clone()))?;
    let mapping =
        pins::map_pin_index(index).ok_or_else(|| PinParseError::OutOfRange(board.clone()))?;

    Ok(ComponentConnection {
        component_id: component_id.to_string(),
        component_pin: component_pin.to_string(),
        arduino_pin: mapping.arduino_pin,
        port: mapping.port,
        bit: mapping.bit,
    })
}

/// Turn raw diagram wires into component connections.
///
/// Wires between two components, wires to power rails and wires with an
/// unparseable board pin are skipped.
pub fn extract_connections(raw: &[RawConnection]) -> Vec<ComponentConnection> {
    raw.iter()
        .filter_map(|conn| match resolve(conn) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                tracing::trace!("Skipping wire {} -> {}: {}", conn.source, conn.target, e);
                None
            }
        })
        .collect()
}

/// Pick the connection that carries a component's signal.
///
/// Candidates are tried in order against the exact pin name first; only when
/// nothing matches exactly is the side suffix ignored.
pub fn select_signal_connection<'a>(
    connections: &[&'a ComponentConnection],
    candidates: &[&str],
) -> Option<&'a ComponentConnection> {
    connections
        .iter()
        .find(|c| candidates.contains(&c.component_pin.as_str()))
        .or_else(|| {
            connections
                .iter()
                .find(|c| candidates.iter().any(|name| c.matches_pin(name)))
        })
        .copied()
}

/// Group connections by component, keeping first-appearance order.
pub fn group_by_component(
    connections: &[ComponentConnection],
) -> Vec<(&str, Vec<&ComponentConnection>)> {
    let mut groups: Vec<(&str, Vec<&ComponentConnection>)> = Vec::new();
    for conn in connections {
        match groups
            .iter_mut()
            .find(|(id, _)| *id == conn.component_id.as_str())
        {
            Some((_, members)) => members.push(conn),
            None => groups.push((conn.component_id.as_str(), vec![conn])),
        }
    }
    groups
}
