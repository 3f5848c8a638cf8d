// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

/// Endpoint prefix used by the controller board in diagram connection tuples.
pub const CONTROLLER_PREFIX: &str = "uno:";

/// Part type of the 74HC595 serial-in/parallel-out shift register.
pub const SHIFT_REGISTER_PART: &str = "wokwi-74hc595";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiagramError {
    #[error("Invalid diagram: missing or invalid \"parts\" array")]
    MissingParts,
    #[error("Invalid diagram: missing or invalid \"connections\" array")]
    MissingConnections,
    #[error("Malformed connection tuple: {0}")]
    MalformedConnection(String),
}

/// A single placed part of a diagram.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Part {
    pub r#type: String,
    pub id: String,
    #[serde(default)]
    pub top: Option<f64>,
    #[serde(default)]
    pub left: Option<f64>,
    #[serde(default)]
    pub rotate: Option<f64>,
    #[serde(default)]
    pub attrs: HashMap<String, serde_json::Value>,
}

/// One `[source, target, color, path?]` wire of a diagram.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "Vec<serde_json::Value>", into = "Vec<serde_json::Value>")]
pub struct RawConnection {
    pub source: String,
    pub target: String,
    pub color: String,
    pub path: Option<serde_json::Value>,
}

impl RawConnection {
    pub fn new(source: &str, target: &str, color: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            color: color.to_string(),
            path: None,
        }
    }

    /// True when either endpoint sits on the controller board.
    pub fn touches_controller(&self) -> bool {
        self.source.starts_with(CONTROLLER_PREFIX) || self.target.starts_with(CONTROLLER_PREFIX)
    }
}

impl TryFrom<Vec<serde_json::Value>> for RawConnection {
    type Error = DiagramError;

    fn try_from(items: Vec<serde_json::Value>) -> Result<Self, Self::Error> {
        let text = |idx: usize| items.get(idx).and_then(|v| v.as_str()).map(str::to_string);
        let (source, target, color) = (text(0), text(1), text(2));

        match (source, target) {
            (Some(source), Some(target)) => Ok(Self {
                source,
                target,
                color: color.unwrap_or_default(),
                path: items.get(3).cloned(),
            }),
            _ => Err(DiagramError::MalformedConnection(
                serde_json::Value::Array(items).to_string(),
            )),
        }
    }
}

impl From<RawConnection> for Vec<serde_json::Value> {
    fn from(conn: RawConnection) -> Self {
        let mut out = vec![
            serde_json::Value::String(conn.source),
            serde_json::Value::String(conn.target),
            serde_json::Value::String(conn.color),
        ];
        if let Some(path) = conn.path {
            out.push(path);
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct DiagramDocument {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    editor: Option<String>,
    parts: Vec<Part>,
    connections: Vec<serde_json::Value>,
}

/// A parsed `diagram.json` file.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Diagram {
    pub version: u32,
    pub author: Option<String>,
    pub editor: Option<String>,
    pub parts: Vec<Part>,
    pub connections: Vec<RawConnection>,
}

impl Diagram {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read diagram at {:?}", path.as_ref()))?;
        Self::from_json_str(&content)
    }

    /// Parse a diagram document. Only the top-level structure is strict;
    /// individual wires that are not `[string, string, ...]` are dropped.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("Failed to parse diagram JSON")?;

        if !value.get("parts").is_some_and(|v| v.is_array()) {
            return Err(DiagramError::MissingParts.into());
        }
        if !value.get("connections").is_some_and(|v| v.is_array()) {
            return Err(DiagramError::MissingConnections.into());
        }

        let doc: DiagramDocument =
            serde_json::from_value(value).context("Failed to parse diagram structure")?;

        let mut connections = Vec::with_capacity(doc.connections.len());
        for entry in doc.connections {
            let items = match entry {
                serde_json::Value::Array(items) => items,
                other => {
                    tracing::warn!("Skipping non-array connection entry {}", other);
                    continue;
                }
            };
            match RawConnection::try_from(items) {
                Ok(conn) => connections.push(conn),
                Err(e) => tracing::warn!("Skipping connection: {}", e),
            }
        }

        Ok(Self {
            version: doc.version.unwrap_or(1),
            author: doc.author,
            editor: doc.editor,
            parts: doc.parts,
            connections,
        })
    }

    /// Wires with at least one endpoint on the controller board.
    pub fn controller_connections(&self) -> impl Iterator<Item = &RawConnection> {
        self.connections.iter().filter(|c| c.touches_controller())
    }

    pub fn has_part_type(&self, part_type: &str) -> bool {
        self.parts.iter().any(|p| p.r#type == part_type)
    }
}

/// Port-C bit positions of the serial data, clock and latch lines feeding a
/// shift-register display.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ShiftRegisterPins {
    pub data_bit: u8,
    pub clock_bit: u8,
    pub latch_bit: u8,
}

impl Default for ShiftRegisterPins {
    fn default() -> Self {
        // A0 = data, A2 = clock, A1 = latch
        Self {
            data_bit: 0,
            clock_bit: 2,
            latch_bit: 1,
        }
    }
}

fn default_cpu_frequency() -> u32 {
    16_000_000
}

fn default_tone() -> u32 {
    440
}

fn default_audible_min() -> u32 {
    20
}

fn default_audible_max() -> u32 {
    20_000
}

fn default_volume() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

/// Tunables for a bridge run, loaded from YAML. Every field is optional.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_cpu_frequency")]
    pub cpu_frequency_hz: u32,
    /// Played when the buzzer goes HIGH without a usable timer configuration.
    #[serde(default = "default_tone")]
    pub default_tone_hz: u32,
    #[serde(default = "default_audible_min")]
    pub audible_min_hz: u32,
    #[serde(default = "default_audible_max")]
    pub audible_max_hz: u32,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub shift_register: ShiftRegisterPins,
    /// Attach the shift-register decoder when the diagram holds a 74HC595.
    #[serde(default = "default_true")]
    pub auto_shift_register: bool,
    #[serde(default)]
    pub trace_ports: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            cpu_frequency_hz: default_cpu_frequency(),
            default_tone_hz: default_tone(),
            audible_min_hz: default_audible_min(),
            audible_max_hz: default_audible_max(),
            volume: default_volume(),
            shift_register: ShiftRegisterPins::default(),
            auto_shift_register: true,
            trace_ports: false,
        }
    }
}

impl BridgeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read bridge config at {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Bridge Config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.cpu_frequency_hz == 0 {
            anyhow::bail!("'cpu_frequency_hz' must be greater than zero");
        }

        if self.audible_min_hz >= self.audible_max_hz {
            anyhow::bail!(
                "Audible range is empty: {}..{} Hz",
                self.audible_min_hz,
                self.audible_max_hz
            );
        }

        if !self.is_audible(self.default_tone_hz) {
            anyhow::bail!(
                "'default_tone_hz' {} lies outside the audible range {}..={} Hz",
                self.default_tone_hz,
                self.audible_min_hz,
                self.audible_max_hz
            );
        }

        if !(0.0..=1.0).contains(&self.volume) {
            anyhow::bail!("'volume' must be within 0.0..=1.0, got {}", self.volume);
        }

        let pins = self.shift_register;
        for (name, bit) in [
            ("data_bit", pins.data_bit),
            ("clock_bit", pins.clock_bit),
            ("latch_bit", pins.latch_bit),
        ] {
            if bit > 7 {
                anyhow::bail!("Shift register '{}' must be 0..=7, got {}", name, bit);
            }
        }
        if pins.data_bit == pins.clock_bit
            || pins.data_bit == pins.latch_bit
            || pins.clock_bit == pins.latch_bit
        {
            anyhow::bail!("Shift register data, clock and latch bits must be distinct");
        }

        Ok(())
    }

    pub fn audible_band(&self) -> AudibleBand {
        AudibleBand {
            min_hz: self.audible_min_hz,
            max_hz: self.audible_max_hz,
        }
    }

    pub fn is_audible(&self, hz: u32) -> bool {
        self.audible_band().contains(hz)
    }
}

/// Inclusive frequency band a buzzer reproduces as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudibleBand {
    pub min_hz: u32,
    pub max_hz: u32,
}

impl AudibleBand {
    pub fn contains(&self, hz: u32) -> bool {
        (self.min_hz..=self.max_hz).contains(&hz)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PortName {
    #[serde(alias = "b")]
    B,
    #[serde(alias = "c")]
    C,
    #[serde(alias = "d")]
    D,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WritePortDetails {
    pub port: PortName,
    pub value: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WritePortStep {
    pub write_port: WritePortDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WriteRegisterDetails {
    pub address: u16,
    pub value: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WriteRegisterStep {
    pub write_register: WriteRegisterDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PressStep {
    pub press: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ReleaseStep {
    pub release: String,
}

/// Bytes clocked out on the configured shift-register lines, each one LSB
/// first and in listed order, followed by one latch pulse.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ShiftOutStep {
    pub shift_out: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum Stimulus {
    WritePort(WritePortStep),
    WriteRegister(WriteRegisterStep),
    Press(PressStep),
    Release(ReleaseStep),
    ShiftOut(ShiftOutStep),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LedDetails {
    pub id: String,
    pub lit: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LedAssertion {
    pub led: LedDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DigitDetails {
    pub id: String,
    /// `None` means the display is blank.
    #[serde(default)]
    pub value: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DigitAssertion {
    pub digit: DigitDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ToneDetails {
    /// `None` means silence.
    #[serde(default)]
    pub hz: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ToneAssertion {
    pub tone: ToneDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum StimulusAssertion {
    Led(LedAssertion),
    Digit(DigitAssertion),
    Tone(ToneAssertion),
}

/// Scripted port activity replayed against the reference AVR model.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StimulusScript {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub steps: Vec<Stimulus>,
    #[serde(default)]
    pub assertions: Vec<StimulusAssertion>,
}

impl StimulusScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open stimulus script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse Stimulus Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Stimulus Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        for step in &self.steps {
            match step {
                Stimulus::Press(PressStep { press: id })
                | Stimulus::Release(ReleaseStep { release: id })
                    if id.trim().is_empty() =>
                {
                    anyhow::bail!("Button step must name a component id");
                }
                Stimulus::ShiftOut(ShiftOutStep { shift_out }) if shift_out.is_empty() => {
                    anyhow::bail!("'shift_out' needs at least one byte");
                }
                _ => {}
            }
        }

        Ok(())
    }
}
