// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use wirebridge_config::{
    BridgeConfig, Diagram, PortName, Stimulus, StimulusAssertion, StimulusScript,
    SHIFT_REGISTER_PART,
};

#[test]
fn test_simon_style_diagram_parses() {
    let json = r#"{
  "version": 1,
  "author": "Uri Shaked",
  "editor": "wokwi",
  "parts": [
    { "type": "wokwi-arduino-uno", "id": "uno", "top": 183, "left": 18.6, "attrs": {} },
    { "type": "wokwi-led", "id": "led-red", "top": 10, "left": 40, "attrs": { "color": "red" } },
    { "type": "wokwi-pushbutton", "id": "btn-red", "top": 60, "left": 40, "attrs": { "color": "red", "key": "1" } },
    { "type": "wokwi-74hc595", "id": "sr1", "top": 120, "left": 300 }
  ],
  "connections": [
    [ "uno:GND.1", "btn-red:2.r", "black", [ "v0" ] ],
    [ "uno:9", "led-red:A", "red", [ "v0" ] ],
    [ "uno:5", "btn-red:1.l", "green", [] ],
    [ "sr1:DS", "uno:A0", "blue", [] ],
    [ "led-red:C", "btn-red:2.l", "black", [] ]
  ]
}"#;
    let diagram = Diagram::from_json_str(json).unwrap();
    assert_eq!(diagram.parts.len(), 4);
    assert_eq!(diagram.author.as_deref(), Some("Uri Shaked"));
    assert_eq!(diagram.parts[1].attrs["color"], "red");
    assert!(diagram.has_part_type(SHIFT_REGISTER_PART));
    assert_eq!(diagram.controller_connections().count(), 4);
}

#[test]
fn test_bridge_config_overrides() {
    let yaml = r#"
schema_version: "1.0"
cpu_frequency_hz: 8000000
default_tone_hz: 1000
volume: 0.5
shift_register:
  data_bit: 3
  clock_bit: 4
  latch_bit: 5
auto_shift_register: false
trace_ports: true
"#;
    let config = BridgeConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.cpu_frequency_hz, 8_000_000);
    assert_eq!(config.default_tone_hz, 1000);
    assert_eq!(config.shift_register.clock_bit, 4);
    assert!(!config.auto_shift_register);
    assert!(config.trace_ports);
    assert_eq!(config.audible_max_hz, 20_000);
}

#[test]
fn test_bridge_config_rejects_unknown_fields() {
    assert!(BridgeConfig::from_yaml("tone: 5").is_err());
}

#[test]
fn test_bridge_config_rejects_bad_volume() {
    for yaml in ["volume: .nan", "volume: 1.5", "volume: -0.1"] {
        let err = BridgeConfig::from_yaml(yaml).unwrap_err();
        assert!(
            format!("{:#}", err).contains("'volume'"),
            "{}: {:#}",
            yaml,
            err
        );
    }
    assert!(BridgeConfig::from_yaml("volume: 0.0").is_ok());
    assert!(BridgeConfig::from_yaml("volume: 1.0").is_ok());
}

#[test]
fn test_bridge_config_rejects_inaudible_default_tone() {
    assert!(BridgeConfig::from_yaml("default_tone_hz: 0").is_err());
    assert!(BridgeConfig::from_yaml("default_tone_hz: 25000").is_err());
    assert!(
        BridgeConfig::from_yaml("audible_min_hz: 500\ndefault_tone_hz: 440").is_err()
    );
    assert!(BridgeConfig::from_yaml("default_tone_hz: 20000").is_ok());
}

#[test]
fn test_bridge_config_rejects_bad_schema() {
    assert!(BridgeConfig::from_yaml("schema_version: \"2.0\"").is_err());
}

#[test]
fn test_stimulus_script_steps_and_assertions() {
    let yaml = r#"
schema_version: "1.0"
steps:
  - write_register: { address: 0xB0, value: 0x02 }
  - write_port: { port: B, value: 0x02 }
  - press: btn-red
  - release: btn-red
  - shift_out: [0xF9, 0xC0]
assertions:
  - led: { id: led-red, lit: true }
  - digit: { id: sevseg1, value: 1 }
  - digit: { id: sevseg2 }
  - tone: { hz: 8000 }
"#;
    let script = StimulusScript::from_yaml(yaml).unwrap();
    assert_eq!(script.steps.len(), 5);
    match &script.steps[0] {
        Stimulus::WriteRegister(step) => {
            assert_eq!(step.write_register.address, 0xB0);
            assert_eq!(step.write_register.value, 0x02);
        }
        other => panic!("unexpected step {:?}", other),
    }
    match &script.steps[1] {
        Stimulus::WritePort(step) => assert_eq!(step.write_port.port, PortName::B),
        other => panic!("unexpected step {:?}", other),
    }
    assert!(matches!(script.steps[2], Stimulus::Press(_)));
    assert!(matches!(script.steps[3], Stimulus::Release(_)));
    assert!(matches!(script.steps[4], Stimulus::ShiftOut(_)));

    assert_eq!(script.assertions.len(), 4);
    match &script.assertions[2] {
        StimulusAssertion::Digit(a) => assert_eq!(a.digit.value, None),
        other => panic!("unexpected assertion {:?}", other),
    }
}

#[test]
fn test_stimulus_script_rejects_empty_shift_out() {
    let yaml = r#"
steps:
  - shift_out: []
"#;
    assert!(StimulusScript::from_yaml(yaml).is_err());
}

#[test]
fn test_stimulus_script_rejects_unknown_step() {
    let yaml = r#"
steps:
  - toggle: led1
"#;
    assert!(StimulusScript::from_yaml(yaml).is_err());
}
