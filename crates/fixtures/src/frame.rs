use std::fmt;

use crate::Fixture;

/// Channel slots in one DMX universe.
pub const UNIVERSE_SIZE: usize = 512;

/// One complete universe of channel values.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    slots: Vec<u8>,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            slots: vec![0; UNIVERSE_SIZE],
        }
    }

    /// Render fixtures in order. Later fixtures overwrite earlier ones where
    /// they overlap.
    pub fn from_fixtures<'a>(fixtures: impl IntoIterator<Item = &'a Fixture>) -> Self {
        let mut frame = Frame::new();
        for fixture in fixtures {
            frame.place(fixture.address, fixture.values());
        }
        frame
    }

    /// Copy `values` in starting at `address`. Anything past the last slot is
    /// dropped.
    pub fn place(&mut self, address: usize, values: &[u8]) {
        if address >= self.slots.len() {
            return;
        }
        let end = (address + values.len()).min(self.slots.len());
        self.slots[address..end].copy_from_slice(&values[..end - address]);
    }

    pub fn get(&self, slot: usize) -> Option<u8> {
        self.slots.get(slot).copied()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.slots
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.slots.clone()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.slots.iter().filter(|v| **v > 0).count();
        write!(f, "Frame({} of {} slots active)", active, self.slots.len())
    }
}
