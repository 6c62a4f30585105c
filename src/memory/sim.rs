use alloc::{collections::BTreeMap, vec, vec::Vec};

use super::paging::{Page, PhysicalAddress};
use super::{Frame, Geometry, PhysicalMemory, Word};

/// Simulated physical memory: a flat word array split into frames, plus
/// a backing store holding the image of every page evicted so far.
pub struct SimMemory {
    geometry: Geometry,
    words: Vec<Word>,
    store: BTreeMap<usize, Vec<Word>>,
}

impl SimMemory {
    pub fn new(geometry: Geometry) -> SimMemory {
        SimMemory {
            geometry,
            words: vec![0; geometry.physical_memory_words()],
            store: BTreeMap::new(),
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Raw view of the frame array, for inspection.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    fn frame_range(&self, frame: Frame) -> core::ops::Range<usize> {
        let start = frame.start_address(self.geometry);
        start..start + self.geometry.page_size()
    }
}

impl PhysicalMemory for SimMemory {
    fn read(&self, address: PhysicalAddress) -> Word {
        self.words[address]
    }

    fn write(&mut self, address: PhysicalAddress, value: Word) {
        self.words[address] = value;
    }

    fn restore(&mut self, frame: Frame, page: Page) {
        let range = self.frame_range(frame);
        match self.store.get(&page.number()) {
            Some(image) => self.words[range].copy_from_slice(image),
            // never evicted means never written: the page is all zeros
            None => self.words[range].fill(0),
        }
    }

    fn evict(&mut self, frame: Frame, page: Page) {
        let range = self.frame_range(frame);
        let image = self.words[range].to_vec();
        self.store.insert(page.number(), image);
    }
}
