// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{RegisterSpace, SimResult, SimulationError};
use std::cell::RefCell;

/// ATmega328P data space: 32 registers, 64 I/O, 160 extended I/O, 2 KiB SRAM.
pub const DATA_SPACE_SIZE: usize = 0x900;

/// A flat, shared data space.
///
/// Interior mutability lets port listeners read timer registers while the
/// write that triggered them is still being dispatched.
#[derive(Debug)]
pub struct DataSpace {
    data: RefCell<Vec<u8>>,
}

impl Default for DataSpace {
    fn default() -> Self {
        Self::new(DATA_SPACE_SIZE)
    }
}

impl DataSpace {
    pub fn new(size: usize) -> Self {
        Self {
            data: RefCell::new(vec![0; size]),
        }
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read_u8(&self, addr: u16) -> SimResult<u8> {
        self.data
            .borrow()
            .get(addr as usize)
            .copied()
            .ok_or(SimulationError::MemoryViolation(addr as u64))
    }

    pub fn write_u8(&self, addr: u16, value: u8) -> SimResult<()> {
        let mut data = self.data.borrow_mut();
        let slot = data
            .get_mut(addr as usize)
            .ok_or(SimulationError::MemoryViolation(addr as u64))?;
        *slot = value;
        Ok(())
    }
}

impl RegisterSpace for DataSpace {
    /// Unmapped addresses read as zero.
    fn read_register(&self, addr: u16) -> u8 {
        self.read_u8(addr).unwrap_or(0)
    }
}
