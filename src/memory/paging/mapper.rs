use log::trace;

use crate::memory::{Frame, Geometry, PhysicalMemory, Word};
use crate::{Error, Result};

use super::alloc::allocate_frame;
use super::table::Table;
use super::{Page, PhysicalAddress, VirtualAddress};

/// Translates virtual addresses by walking the page-table tree rooted at
/// frame 0, building the tree as it goes. Missing tables and missing
/// pages are materialized on first touch; nothing is cached, every call
/// walks from the root again.
pub struct Mapper<M> {
    geometry: Geometry,
    memory: M,
}

impl<M: PhysicalMemory> Mapper<M> {
    /// Builds a mapper over `memory` and zeroes the root table. Nothing
    /// is assumed about any other frame.
    pub fn new(geometry: Geometry, memory: M) -> Mapper<M> {
        let mut mapper = Mapper { geometry, memory };
        mapper.initialize();
        mapper
    }

    /// Zeroes frame 0, the permanent root of the table tree.
    pub fn initialize(&mut self) {
        Table::at(Frame::ROOT, self.geometry).zero(&mut self.memory);
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Walks the tree for `address`, materializing any missing level,
    /// and returns the physical word address it maps to.
    pub fn translate(&mut self, address: VirtualAddress) -> Result<PhysicalAddress> {
        if address >= self.geometry.virtual_memory_size() {
            return Err(Error::AddressOutOfRange);
        }
        let page = Page::from_address(self.geometry, address);
        let mut current = Frame::ROOT;
        for level in 0..self.geometry.tables_depth() {
            let table = Table::at(current, self.geometry);
            let slot = page.slot(self.geometry, level);
            current = match table.entry(&self.memory, slot).frame() {
                Some(next) => next,
                // the frame being filled is off limits deeper down
                None => allocate_frame(
                    &mut self.memory,
                    self.geometry,
                    page,
                    level,
                    current,
                    table.slot_address(slot),
                ),
            };
        }
        trace!("page {} resides in frame {}", page.number(), current.number());
        Ok(current.start_address(self.geometry) + self.geometry.offset_of(address))
    }

    /// Reads the word behind a virtual address.
    ///
    /// Fails only on an out-of-range address, before any memory is
    /// touched.
    pub fn read(&mut self, address: VirtualAddress) -> Result<Word> {
        let physical = self.translate(address)?;
        Ok(self.memory.read(physical))
    }

    /// Writes the word behind a virtual address.
    ///
    /// Fails only on an out-of-range address, before any memory is
    /// touched.
    pub fn write(&mut self, address: VirtualAddress, value: Word) -> Result<()> {
        let physical = self.translate(address)?;
        self.memory.write(physical, value);
        Ok(())
    }
}
