//! A demand-paged virtual memory simulation.
//!
//! Virtual addresses are translated through a multi-level page-table tree
//! that lives inside a fixed array of physical frames. Table frames are
//! materialized the first time a walk needs them, and once every frame is
//! occupied the resident page farthest (on the page ring) from the
//! faulting one is evicted to a backing store to make room.
//!
//! The core is [`Mapper`], generic over the [`PhysicalMemory`] backend.
//! [`SimMemory`] is the crate's own backend: an in-memory frame array
//! plus a backing store keyed by page number. For embeddings that want
//! the classic free-function surface there is a process-wide machine
//! behind [`initialize`], [`read`] and [`write`].
#![cfg_attr(not(test), no_std)]

extern crate alloc;

use core::fmt;

use spin::Mutex;

mod memory;

pub use crate::memory::paging::{Mapper, Page, PhysicalAddress, VirtualAddress};
pub use crate::memory::{Frame, Geometry, PhysicalMemory, SimMemory, Word};

/// Failures visible to callers.
///
/// Translation itself is total: allocation always finds a frame, by
/// reclaiming an empty table, taking a never-used frame or evicting a
/// resident page. Only input validation and use before `initialize` can
/// fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The virtual address lies beyond the virtual memory size.
    AddressOutOfRange,
    /// The global machine was used before [`initialize`].
    Uninitialized,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::AddressOutOfRange => write!(f, "virtual address out of range"),
            Error::Uninitialized => write!(f, "virtual memory not initialized"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

// The process-wide machine behind the free-function API. The mutex also
// serializes concurrent embedders; the translation core itself assumes
// exclusive access for the duration of one call.
static MACHINE: Mutex<Option<Mapper<SimMemory>>> = Mutex::new(None);

/// (Re)creates the global machine with [`Geometry::DEFAULT`].
///
/// Only the root table frame is zeroed; nothing is assumed about the
/// contents of any other frame.
pub fn initialize() {
    let geometry = Geometry::DEFAULT;
    *MACHINE.lock() = Some(Mapper::new(geometry, SimMemory::new(geometry)));
}

/// Reads the word behind `address` through the global machine.
pub fn read(address: VirtualAddress) -> Result<Word> {
    MACHINE
        .lock()
        .as_mut()
        .ok_or(Error::Uninitialized)?
        .read(address)
}

/// Writes `value` behind `address` through the global machine.
pub fn write(address: VirtualAddress, value: Word) -> Result<()> {
    MACHINE
        .lock()
        .as_mut()
        .ok_or(Error::Uninitialized)?
        .write(address, value)
}
