// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Serial-in/parallel-out decoding for two cascaded 74HC595s driving a pair
//! of seven-segment displays.

use crate::drivers::PortEvent;
use std::collections::VecDeque;
use tracing::{debug, trace};
use wirebridge_config::ShiftRegisterPins;

/// Bits per display frame: one byte per display.
pub const FRAME_BITS: usize = 16;

/// Middle segment only: shown as a dash, decoded as no digit.
pub const BLANK_PATTERN: u8 = 0b1011_1111;

/// Active-low segment patterns for 0-9, indexed by digit.
pub const DIGIT_PATTERNS: [u8; 10] = [
    0b1100_0000,
    0b1111_1001,
    0b1010_0100,
    0b1011_0000,
    0b1001_1001,
    0b1001_0010,
    0b1000_0010,
    0b1111_1000,
    0b1000_0000,
    0b1001_0000,
];

/// Digit shown by a segment pattern. The blank pattern and anything not in
/// the table decode to `None`.
pub fn decode_segments(pattern: u8) -> Option<u8> {
    DIGIT_PATTERNS
        .iter()
        .position(|&p| p == pattern)
        .map(|digit| digit as u8)
}

/// Edge-detection state carried between port writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftRegisterState {
    pub bits: VecDeque<u8>,
    pub last_clock: bool,
    pub last_latch: bool,
}

/// Digits decoded on a latch edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFrame {
    pub ones: Option<u8>,
    pub tens: Option<u8>,
    pub low_byte: u8,
    pub high_byte: u8,
}

impl DisplayFrame {
    fn from_bits(bits: &VecDeque<u8>) -> Self {
        // The first bit clocked in becomes bit 0 of its byte.
        let byte = |range: std::ops::Range<usize>| {
            range
                .enumerate()
                .fold(0u8, |acc, (shift, idx)| acc | ((bits[idx] & 1) << shift))
        };
        let low_byte = byte(0..8);
        let high_byte = byte(8..FRAME_BITS);
        Self {
            ones: decode_segments(low_byte),
            tens: decode_segments(high_byte),
            low_byte,
            high_byte,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShiftRegisterDecoder {
    pins: ShiftRegisterPins,
    state: ShiftRegisterState,
}

impl ShiftRegisterDecoder {
    pub fn new(pins: ShiftRegisterPins) -> Self {
        Self {
            pins,
            state: ShiftRegisterState::default(),
        }
    }

    pub fn state(&self) -> &ShiftRegisterState {
        &self.state
    }

    /// Feed one port value. Returns a frame when a latch edge finds a full
    /// 16-bit buffer.
    ///
    /// A latch edge on a partial buffer is ignored and keeps the queued bits.
    pub fn step(&mut self, value: u8) -> Option<DisplayFrame> {
        let event = PortEvent::new(value, value);
        let data = event.level(self.pins.data_bit);
        let clock = event.level(self.pins.clock_bit);
        let latch = event.level(self.pins.latch_bit);

        if clock && !self.state.last_clock {
            self.state.bits.push_back(data as u8);
            if self.state.bits.len() > FRAME_BITS {
                self.state.bits.pop_front();
            }
            trace!("595 shift {} ({} buffered)", data as u8, self.state.bits.len());
        }

        let mut frame = None;
        if latch && !self.state.last_latch {
            if self.state.bits.len() == FRAME_BITS {
                let decoded = DisplayFrame::from_bits(&self.state.bits);
                debug!(
                    "595 latch {:#04x} {:#04x} -> ones {:?} tens {:?}",
                    decoded.low_byte, decoded.high_byte, decoded.ones, decoded.tens
                );
                frame = Some(decoded);
            } else {
                debug!(
                    "595 latch with {} of {} bits ignored",
                    self.state.bits.len(),
                    FRAME_BITS
                );
            }
        }

        self.state.last_clock = clock;
        self.state.last_latch = latch;
        frame
    }
}

/// Port values that clock `bytes` out LSB first, in the order given, then
/// pulse the latch. `base` supplies the levels of the other port bits.
pub fn clock_out_sequence(pins: ShiftRegisterPins, base: u8, bytes: &[u8]) -> Vec<u8> {
    let data = 1u8 << (pins.data_bit & 7);
    let clock = 1u8 << (pins.clock_bit & 7);
    let latch = 1u8 << (pins.latch_bit & 7);
    let idle = base & !(data | clock | latch);

    let mut values = Vec::with_capacity(bytes.len() * 16 + 3);
    for &byte in bytes {
        for shift in 0..8 {
            let level = if byte >> shift & 1 == 1 { data } else { 0 };
            values.push(idle | level);
            values.push(idle | level | clock);
        }
    }
    values.push(idle);
    values.push(idle | latch);
    values.push(idle);
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut ShiftRegisterDecoder, values: &[u8]) -> Vec<DisplayFrame> {
        values.iter().filter_map(|&v| decoder.step(v)).collect()
    }

    #[test]
    fn test_segment_table() {
        assert_eq!(decode_segments(0xC0), Some(0));
        assert_eq!(decode_segments(0xF9), Some(1));
        assert_eq!(decode_segments(0x90), Some(9));
        assert_eq!(decode_segments(BLANK_PATTERN), None);
        assert_eq!(decode_segments(0x00), None);
        assert_eq!(decode_segments(0xFF), None);
    }

    #[test]
    fn test_zero_then_one() {
        let pins = ShiftRegisterPins::default();
        let mut decoder = ShiftRegisterDecoder::new(pins);

        let frames = feed(
            &mut decoder,
            &clock_out_sequence(pins, 0, &[0b1100_0000, 0b1111_1001]),
        );
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].ones, Some(0));
        assert_eq!(frames[0].tens, Some(1));
        assert_eq!(frames[0].low_byte, 0xC0);
        assert_eq!(frames[0].high_byte, 0xF9);
    }

    #[test]
    fn test_blank_and_unknown_patterns() {
        let pins = ShiftRegisterPins::default();
        let mut decoder = ShiftRegisterDecoder::new(pins);

        let frames = feed(
            &mut decoder,
            &clock_out_sequence(pins, 0, &[BLANK_PATTERN, 0x55]),
        );
        assert_eq!(frames[0].ones, None);
        assert_eq!(frames[0].tens, None);
    }

    #[test]
    fn test_short_latch_keeps_buffer() {
        let pins = ShiftRegisterPins::default();
        let mut decoder = ShiftRegisterDecoder::new(pins);

        // 8 bits then a latch: nothing decoded, bits kept.
        let frames = feed(&mut decoder, &clock_out_sequence(pins, 0, &[0xC0]));
        assert!(frames.is_empty());
        assert_eq!(decoder.state().bits.len(), 8);

        // The next byte completes the frame on its latch.
        let frames = feed(&mut decoder, &clock_out_sequence(pins, 0, &[0xF9]));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].ones, Some(0));
        assert_eq!(frames[0].tens, Some(1));
    }

    #[test]
    fn test_buffer_is_capped() {
        let pins = ShiftRegisterPins::default();
        let mut decoder = ShiftRegisterDecoder::new(pins);

        // A stale leading byte falls out of the window.
        let frames = feed(
            &mut decoder,
            &clock_out_sequence(pins, 0, &[0x00, 0xA4, 0xB0]),
        );
        assert_eq!(decoder.state().bits.len(), FRAME_BITS);
        assert_eq!(frames[0].ones, Some(2));
        assert_eq!(frames[0].tens, Some(3));
    }

    #[test]
    fn test_held_clock_shifts_once() {
        let pins = ShiftRegisterPins::default();
        let mut decoder = ShiftRegisterDecoder::new(pins);
        let clock = 1 << pins.clock_bit;

        decoder.step(0);
        decoder.step(clock | 1);
        decoder.step(clock | 1);
        decoder.step(clock);
        assert_eq!(decoder.state().bits, VecDeque::from(vec![1]));
        assert!(decoder.state().last_clock);
    }

    #[test]
    fn test_sequence_preserves_other_bits() {
        let pins = ShiftRegisterPins::default();
        let seq = clock_out_sequence(pins, 0b1111_1111, &[0x01]);
        assert_eq!(seq.len(), 19);
        assert!(seq.iter().all(|v| v & 0b1111_1000 == 0b1111_1000));
        assert_eq!(seq[0], 0b1111_1001);
        assert_eq!(seq[1], 0b1111_1101);
        assert_eq!(seq[17], 0b1111_1010);
    }
}
