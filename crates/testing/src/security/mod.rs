//! Black-box checks of [`kcore::mem::TestMemoryArena`]'s overrun
//! detection and fault-injection contract, driven entirely through its
//! public `MemoryManager` surface (no access to its internal header
//! layout -- the same boundary an installed allocator's caller has).

pub mod memory_safety;
