// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::PortEvent;
use crate::audio::BuzzerAudio;
use crate::components::ElementHandle;
use crate::peripherals::timer::{ToneTimer, TIMER2};
use crate::tone::{extract_frequency_at, TimerSnapshot};
use crate::{DigitalLevel, RegisterSpace};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;
use wirebridge_config::{AudibleBand, BridgeConfig};

/// How a buzzer turns timer state into an audible frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneSettings {
    pub timer: ToneTimer,
    pub cpu_frequency_hz: u32,
    pub default_tone_hz: u32,
    pub audible: AudibleBand,
}

impl From<&BridgeConfig> for ToneSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            timer: TIMER2,
            cpu_frequency_hz: config.cpu_frequency_hz,
            default_tone_hz: config.default_tone_hz,
            audible: config.audible_band(),
        }
    }
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl ToneSettings {
    /// The extracted frequency when audible, otherwise the default tone.
    pub fn choose(&self, extracted_hz: u32) -> u32 {
        if self.audible.contains(extracted_hz) {
            extracted_hz
        } else {
            self.default_tone_hz
        }
    }
}

#[derive(Debug)]
pub struct LedDriver {
    id: String,
    element: ElementHandle,
}

impl LedDriver {
    pub fn new(id: &str, element: ElementHandle) -> Self {
        Self {
            id: id.to_string(),
            element,
        }
    }

    pub fn update(&mut self, event: &PortEvent, bit: u8) {
        let lit = event.level(bit);
        self.element.borrow_mut().set_lit(lit);
        if event.changed(bit) {
            debug!("LED {} bit {} = {}", self.id, bit, DigitalLevel::from(lit));
        }
    }
}

pub struct BuzzerDriver {
    id: String,
    element: ElementHandle,
    audio: Rc<RefCell<BuzzerAudio>>,
    registers: Rc<dyn RegisterSpace>,
    settings: ToneSettings,
}

impl BuzzerDriver {
    pub fn new(
        id: &str,
        element: ElementHandle,
        audio: Rc<RefCell<BuzzerAudio>>,
        registers: Rc<dyn RegisterSpace>,
        settings: ToneSettings,
    ) -> Self {
        Self {
            id: id.to_string(),
            element,
            audio,
            registers,
            settings,
        }
    }

    pub fn update(&mut self, event: &PortEvent, bit: u8) {
        let high = event.level(bit);
        self.element.borrow_mut().set_signal(high);

        if !high {
            self.audio.borrow_mut().stop_tone();
            if event.changed(bit) {
                debug!("Buzzer {} bit {} = LOW, stopped", self.id, bit);
            }
            return;
        }

        let snapshot = TimerSnapshot::capture(self.registers.as_ref(), &self.settings.timer);
        let extracted = extract_frequency_at(&snapshot, self.settings.cpu_frequency_hz);
        let frequency = self.settings.choose(extracted);
        self.audio.borrow_mut().play_tone(frequency);

        if event.changed(bit) {
            debug!(
                "Buzzer {} bit {} = HIGH, playing {}Hz (timer: {}Hz)",
                self.id, bit, frequency, extracted
            );
        }
    }
}

/// Drivers for components that follow a port bit.
pub enum OutputDriver {
    Led(LedDriver),
    Buzzer(BuzzerDriver),
}

impl OutputDriver {
    pub fn id(&self) -> &str {
        match self {
            OutputDriver::Led(d) => &d.id,
            OutputDriver::Buzzer(d) => &d.id,
        }
    }

    pub fn update(&mut self, event: &PortEvent, bit: u8) {
        match self {
            OutputDriver::Led(d) => d.update(event, bit),
            OutputDriver::Buzzer(d) => d.update(event, bit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::test_support::{RecordingSink, SinkEvent};
    use crate::components::VirtualElement;
    use crate::memory::DataSpace;

    fn buzzer(
        data: &Rc<DataSpace>,
    ) -> (
        BuzzerDriver,
        Rc<RefCell<VirtualElement>>,
        Rc<RefCell<BuzzerAudio>>,
        RecordingSink,
    ) {
        let element = VirtualElement::shared();
        let sink = RecordingSink::default();
        let audio = Rc::new(RefCell::new(BuzzerAudio::new(Box::new(sink.clone()))));
        let driver = BuzzerDriver::new(
            "buzzer1",
            element.clone(),
            audio.clone(),
            data.clone(),
            ToneSettings::default(),
        );
        (driver, element, audio, sink)
    }

    #[test]
    fn test_led_follows_bit() {
        let element = VirtualElement::shared();
        let mut led = LedDriver::new("led1", element.clone());

        led.update(&PortEvent::new(0b10, 0), 1);
        assert!(element.borrow().lit);
        led.update(&PortEvent::new(0b00, 0b10), 1);
        assert!(!element.borrow().lit);
        led.update(&PortEvent::new(0b01, 0b00), 1);
        assert!(!element.borrow().lit);
    }

    #[test]
    fn test_buzzer_plays_timer_frequency() {
        let data = Rc::new(DataSpace::default());
        for (addr, value) in TIMER2.ctc_writes(2, 124) {
            data.write_u8(addr, value).unwrap();
        }
        let (mut driver, element, audio, _) = buzzer(&data);

        driver.update(&PortEvent::new(0b1000, 0), 3);
        assert!(element.borrow().signal);
        assert_eq!(audio.borrow().current_tone(), Some(8000));

        driver.update(&PortEvent::new(0, 0b1000), 3);
        assert!(!element.borrow().signal);
        assert_eq!(audio.borrow().current_tone(), None);
    }

    #[test]
    fn test_buzzer_falls_back_to_default_tone() {
        let data = Rc::new(DataSpace::default());
        let (mut driver, _, audio, _) = buzzer(&data);

        driver.update(&PortEvent::new(1, 0), 0);
        assert_eq!(audio.borrow().current_tone(), Some(440));
    }

    #[test]
    fn test_buzzer_rejects_inaudible_frequency() {
        let data = Rc::new(DataSpace::default());
        // 16e6 / (2 * 1 * 2) = 4 MHz
        for (addr, value) in TIMER2.ctc_writes(1, 1) {
            data.write_u8(addr, value).unwrap();
        }
        let (mut driver, _, audio, _) = buzzer(&data);

        driver.update(&PortEvent::new(1, 0), 0);
        assert_eq!(audio.borrow().current_tone(), Some(440));
    }

    #[test]
    fn test_repeated_high_writes_do_not_restart() {
        let data = Rc::new(DataSpace::default());
        let (mut driver, _, _, sink) = buzzer(&data);

        driver.update(&PortEvent::new(0b01, 0b00), 0);
        driver.update(&PortEvent::new(0b11, 0b01), 0);
        driver.update(&PortEvent::new(0b01, 0b11), 0);
        assert_eq!(sink.count(&SinkEvent::Start(440)), 1);
        assert_eq!(sink.count(&SinkEvent::Stop), 0);
    }

    #[test]
    fn test_tone_settings_choose() {
        let settings = ToneSettings::default();
        assert_eq!(settings.choose(0), 440);
        assert_eq!(settings.choose(19), 440);
        assert_eq!(settings.choose(20), 20);
        assert_eq!(settings.choose(8000), 8000);
        assert_eq!(settings.choose(20_001), 440);
    }

    #[test]
    fn test_tone_settings_follow_configured_band() {
        let config = BridgeConfig {
            audible_min_hz: 100,
            audible_max_hz: 5000,
            default_tone_hz: 1000,
            ..BridgeConfig::default()
        };
        let settings = ToneSettings::from(&config);
        assert_eq!(settings.choose(99), 1000);
        assert_eq!(settings.choose(100), 100);
        assert_eq!(settings.choose(5000), 5000);
        assert_eq!(settings.choose(8000), 1000);
        assert_eq!(settings.audible, config.audible_band());
    }
}
