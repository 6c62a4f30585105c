use crate::memory::{Frame, Geometry, PhysicalMemory};

use super::entry::Entry;
use super::PhysicalAddress;

/// A frame viewed as a page table: `page_size` entries living in backend
/// memory. The view is a cheap lens; it owns nothing.
#[derive(Debug, Clone, Copy)]
pub struct Table {
    frame: Frame,
    geometry: Geometry,
}

impl Table {
    pub fn at(frame: Frame, geometry: Geometry) -> Table {
        Table { frame, geometry }
    }

    pub fn frame(self) -> Frame {
        self.frame
    }

    /// Physical address of the table word at `slot`.
    pub fn slot_address(self, slot: usize) -> PhysicalAddress {
        self.frame.start_address(self.geometry) + slot
    }

    pub fn entry<M: PhysicalMemory>(self, memory: &M, slot: usize) -> Entry {
        Entry::from_word(memory.read(self.slot_address(slot)))
    }

    pub fn set_entry<M: PhysicalMemory>(self, memory: &mut M, slot: usize, entry: Entry) {
        memory.write(self.slot_address(slot), entry.word());
    }

    /// True when no slot references a child.
    pub fn is_empty<M: PhysicalMemory>(self, memory: &M) -> bool {
        (0..self.geometry.page_size()).all(|slot| self.entry(memory, slot).is_absent())
    }

    pub fn zero<M: PhysicalMemory>(self, memory: &mut M) {
        for slot in 0..self.geometry.page_size() {
            self.set_entry(memory, slot, Entry::ABSENT);
        }
    }
}
