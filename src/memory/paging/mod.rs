pub use self::mapper::Mapper;

use crate::memory::Geometry;

mod alloc;
mod entry;
mod mapper;
mod table;

/// A word-granular address into physical memory:
/// `frame_index * page_size + slot`.
pub type PhysicalAddress = usize;

/// A word-granular address into virtual memory, below
/// `virtual_memory_size`.
pub type VirtualAddress = usize;

/**
The bit layout of a virtual address, for the default geometry
(20/10/4-bit widths, so four table levels):

```text
Bit(s)  Name        Meaning
0-3     Offset      Word offset inside the page
4-7     Level 3     Slot in the leaf table, selects the data frame
8-11    Level 2     Slot in the level-2 table
12-15   Level 1     Slot in the level-1 table
16-19   Level 0     Slot in the root table (frame 0)
```

The slot fields concatenated, top to bottom, are the page number. During
a tree walk the partial concatenation accumulated so far identifies the
subtree, and at the leaf level it equals the page number of the child.
**/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Page {
    number: usize,
}

impl Page {
    pub const fn new(number: usize) -> Page {
        Page { number }
    }

    /// The page containing a virtual address.
    pub fn from_address(geometry: Geometry, address: VirtualAddress) -> Page {
        Page {
            number: address >> geometry.offset_width(),
        }
    }

    pub const fn number(self) -> usize {
        self.number
    }

    /// Table slot this page selects at `level` of the walk.
    pub fn slot(self, geometry: Geometry, level: usize) -> usize {
        let below = (geometry.tables_depth() - 1 - level) as u32;
        (self.number >> (below * geometry.offset_width())) & geometry.offset_mask()
    }

    /// Slot of this page in its leaf table, the lowest slot field.
    pub fn leaf_slot(self, geometry: Geometry) -> usize {
        self.number & geometry.offset_mask()
    }

    /// The shorter of the two arc lengths between two page numbers on
    /// the ring of `num_pages` pages.
    pub fn cyclic_distance(self, geometry: Geometry, other: Page) -> usize {
        let apart = if self.number > other.number {
            self.number - other.number
        } else {
            other.number - self.number
        };
        apart.min(geometry.num_pages() - apart)
    }
}
