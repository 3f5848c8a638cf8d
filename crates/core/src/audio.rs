// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use tracing::{debug, warn};

/// An audio device able to produce a single square-wave tone.
pub trait AudioSink: std::fmt::Debug {
    fn start(&mut self, frequency_hz: u32, volume: f32);
    fn stop(&mut self);
    fn set_volume(&mut self, _volume: f32) {}
    fn close(&mut self) {}
}

/// Sink that produces no sound and only logs.
#[derive(Debug, Default)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn start(&mut self, frequency_hz: u32, volume: f32) {
        debug!("Audio: start {}Hz at volume {:.2}", frequency_hz, volume);
    }

    fn stop(&mut self) {
        debug!("Audio: stop");
    }
}

/// The one tone generator of a simulation run, shared by every buzzer.
///
/// Owned by the bridge for the lifetime of a run and released exactly once.
#[derive(Debug)]
pub struct BuzzerAudio {
    sink: Box<dyn AudioSink>,
    current_frequency: u32,
    playing: bool,
    volume: f32,
    released: bool,
}

impl BuzzerAudio {
    pub const DEFAULT_VOLUME: f32 = 0.1;

    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            current_frequency: 0,
            playing: false,
            volume: Self::DEFAULT_VOLUME,
            released: false,
        }
    }

    /// Start (or keep) a tone. Re-requesting the tone already playing is a no-op.
    pub fn play_tone(&mut self, frequency_hz: u32) {
        if self.released {
            warn!("Audio: play {}Hz after release ignored", frequency_hz);
            return;
        }

        if self.playing && frequency_hz == self.current_frequency {
            return;
        }

        self.stop_tone();
        self.sink.start(frequency_hz, self.volume);
        self.current_frequency = frequency_hz;
        self.playing = true;
        debug!("Audio: playing tone at {}Hz", frequency_hz);
    }

    pub fn stop_tone(&mut self) {
        if !self.playing {
            return;
        }
        self.sink.stop();
        self.playing = false;
        self.current_frequency = 0;
    }

    /// Volume is clamped to `0.0..=1.0`. NaN keeps the current volume.
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            warn!("Audio: ignoring NaN volume");
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        if !self.released {
            self.sink.set_volume(self.volume);
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn current_tone(&self) -> Option<u32> {
        self.playing.then_some(self.current_frequency)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop and close the device. Returns false if it was already released.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.stop_tone();
        self.sink.close();
        self.released = true;
        debug!("Audio: released");
        true
    }
}
