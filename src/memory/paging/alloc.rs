use log::debug;

use crate::memory::{Frame, Geometry, PhysicalMemory};

use super::entry::Entry;
use super::table::Table;
use super::{Page, PhysicalAddress};

/// Best eviction candidate seen so far: the resident page farthest, by
/// cyclic distance, from the faulting page.
#[derive(Debug, Clone, Copy)]
struct Victim {
    page: Page,
    parent: Frame,
    frame: Frame,
    distance: usize,
}

/// One depth-first search of the table tree, gathering in a single pass
/// everything the allocator might need:
///
/// * `max_seen`, the highest frame index referenced anywhere, so that
///   `max_seen + 1` is the first never-used frame;
/// * the first all-zero table, adopted on the spot (unlinked from its
///   old parent and published at `target_slot`);
/// * the farthest resident page, in case eviction is the only way out.
///
/// `forbidden` is the frame that owns `target_slot`: the frame the walk
/// is standing on. It may itself be an empty table (all further slots
/// zero), and stealing it would detach the very subtree being built, so
/// the search never adopts it.
struct FrameSearch {
    page: Page,
    forbidden: Frame,
    target_slot: PhysicalAddress,
    max_seen: usize,
    empty_table: Option<Frame>,
    victim: Option<Victim>,
}

impl FrameSearch {
    fn run<M: PhysicalMemory>(
        memory: &mut M,
        geometry: Geometry,
        page: Page,
        forbidden: Frame,
        target_slot: PhysicalAddress,
    ) -> FrameSearch {
        let mut search = FrameSearch {
            page,
            forbidden,
            target_slot,
            max_seen: 0,
            empty_table: None,
            victim: None,
        };
        search.visit(memory, geometry, Table::at(Frame::ROOT, geometry), 0, 0, None);
        search
    }

    fn visit<M: PhysicalMemory>(
        &mut self,
        memory: &mut M,
        geometry: Geometry,
        table: Table,
        level: usize,
        path: usize,
        parent_slot: Option<PhysicalAddress>,
    ) {
        let leaf_level = level == geometry.tables_depth() - 1;
        for slot in 0..geometry.page_size() {
            let child = match table.entry(memory, slot).frame() {
                Some(child) => child,
                None => continue,
            };
            if child.number() < geometry.num_frames() {
                self.max_seen = self.max_seen.max(child.number());
            }
            let child_path = (path << geometry.offset_width()) | slot;
            if leaf_level {
                // children of the last table level are resident pages
                self.offer_victim(geometry, Page::new(child_path), table.frame(), child);
            } else {
                self.visit(
                    memory,
                    geometry,
                    Table::at(child, geometry),
                    level + 1,
                    child_path,
                    Some(table.slot_address(slot)),
                );
                if self.empty_table.is_some() {
                    // adopted below: nothing deeper can improve on it
                    return;
                }
            }
        }
        if let Some(old_slot) = parent_slot {
            if table.frame() != self.forbidden && table.is_empty(memory) {
                self.adopt(memory, table.frame(), old_slot);
            }
        }
    }

    /// Slots are scanned in ascending order and the comparison is
    /// strict, so among equidistant pages the earliest walk path wins.
    fn offer_victim(&mut self, geometry: Geometry, page: Page, parent: Frame, frame: Frame) {
        let distance = self.page.cyclic_distance(geometry, page);
        let improves = match self.victim {
            Some(best) => distance > best.distance,
            None => true,
        };
        if improves {
            self.victim = Some(Victim {
                page,
                parent,
                frame,
                distance,
            });
        }
    }

    /// Rebinds an all-zero table. The old parent slot is zeroed before
    /// the frame is published at the target slot, so no two slots ever
    /// reference the frame at once.
    fn adopt<M: PhysicalMemory>(&mut self, memory: &mut M, frame: Frame, old_slot: PhysicalAddress) {
        memory.write(old_slot, Entry::ABSENT.word());
        memory.write(self.target_slot, Entry::pointing_to(frame).word());
        self.empty_table = Some(frame);
    }
}

/// Finds a frame for the child slot at `target_slot` and installs it.
///
/// Strategies, in order: reclaim an all-zero table, take a never-used
/// frame, evict the resident page farthest from the faulting one. At the
/// leaf level the chosen frame is then filled from the backing store;
/// at any other level it becomes a zeroed table.
pub(super) fn allocate_frame<M: PhysicalMemory>(
    memory: &mut M,
    geometry: Geometry,
    page: Page,
    level: usize,
    forbidden: Frame,
    target_slot: PhysicalAddress,
) -> Frame {
    let search = FrameSearch::run(memory, geometry, page, forbidden, target_slot);

    let frame = if let Some(frame) = search.empty_table {
        // already unlinked and published by the search
        debug!("reclaiming empty table frame {}", frame.number());
        frame
    } else if search.max_seen + 1 < geometry.num_frames() {
        let frame = Frame::new(search.max_seen + 1);
        debug!("taking fresh frame {}", frame.number());
        memory.write(target_slot, Entry::pointing_to(frame).word());
        frame
    } else {
        let victim = search
            .victim
            .expect("memory is full yet no page is resident");
        debug!(
            "evicting page {} from frame {}",
            victim.page.number(),
            victim.frame.number()
        );
        memory.evict(victim.frame, victim.page);
        Table::at(victim.parent, geometry).set_entry(
            memory,
            victim.page.leaf_slot(geometry),
            Entry::ABSENT,
        );
        memory.write(target_slot, Entry::pointing_to(victim.frame).word());
        victim.frame
    };

    if level == geometry.tables_depth() - 1 {
        // the new child hosts the faulting page itself
        memory.restore(frame, page);
    } else {
        Table::at(frame, geometry).zero(memory);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SimMemory;

    const SMALL: Geometry = Geometry::new(5, 4, 1);

    // Two resident pages on an otherwise full machine:
    //
    //   root[0] -> 1, 1[0] -> 2, 1[1] -> 3, 2[1] -> 4, 3[1] -> 6,
    //   4[1] -> 5 (page 0b0011), 6[1] -> 7 (page 0b0111)
    fn two_page_tree() -> SimMemory {
        let mut memory = SimMemory::new(SMALL);
        for (address, value) in [(0, 1), (2, 2), (3, 3), (5, 4), (7, 6), (9, 5), (13, 7)] {
            memory.write(address, value);
        }
        memory
    }

    #[test]
    fn farthest_resident_page_becomes_the_victim() {
        let mut memory = two_page_tree();
        let search = FrameSearch::run(&mut memory, SMALL, Page::new(0b1111), Frame::ROOT, 0);
        assert_eq!(search.max_seen, 7);
        assert!(search.empty_table.is_none());
        // distances from page 15: page 3 is 4 away, page 7 is 8 away
        let victim = search.victim.unwrap();
        assert_eq!(victim.page, Page::new(0b0111));
        assert_eq!(victim.frame, Frame::new(7));
        assert_eq!(victim.parent, Frame::new(6));
    }

    #[test]
    fn equidistant_pages_break_toward_the_earliest_path() {
        let mut memory = two_page_tree();
        // pages 3 and 7 are both two steps from page 5
        let search = FrameSearch::run(&mut memory, SMALL, Page::new(0b0101), Frame::ROOT, 0);
        let victim = search.victim.unwrap();
        assert_eq!(victim.page, Page::new(0b0011));
        assert_eq!(victim.frame, Frame::new(5));
        assert_eq!(victim.parent, Frame::new(4));
    }

    #[test]
    fn empty_table_is_unlinked_then_republished() {
        let mut memory = two_page_tree();
        // empty the leaf table in frame 4 by unlinking its only page
        memory.write(9, 0);
        // fill slot 0 of frame 6 (address 12) for faulting page 0b0110
        let frame = allocate_frame(&mut memory, SMALL, Page::new(0b0110), 3, Frame::new(6), 12);
        assert_eq!(frame, Frame::new(4));
        assert_eq!(memory.read(5), 0, "old parent slot must be unlinked");
        assert_eq!(memory.read(12), 4);
        // leaf-level placement restores the page: never written, so zeros
        assert_eq!(&memory.words()[8..10], &[0, 0]);
    }

    #[test]
    fn the_forbidden_frame_is_never_adopted() {
        let mut memory = two_page_tree();
        memory.write(9, 0);
        // same fault, but frame 4 owns the slot being filled: no other
        // table is empty, so the one remaining resident page is evicted
        let search = FrameSearch::run(&mut memory, SMALL, Page::new(0b0110), Frame::new(4), 8);
        assert!(search.empty_table.is_none());
        let victim = search.victim.unwrap();
        assert_eq!(victim.page, Page::new(0b0111));
    }

    #[test]
    fn fresh_frames_follow_the_highest_referenced_index() {
        let mut memory = SimMemory::new(SMALL);
        let frame = allocate_frame(&mut memory, SMALL, Page::new(0b1000), 0, Frame::ROOT, 1);
        assert_eq!(frame, Frame::new(1));
        assert_eq!(memory.read(1), 1);
        // an internal placement leaves a zeroed table behind
        assert_eq!(&memory.words()[2..4], &[0, 0]);
    }
}
