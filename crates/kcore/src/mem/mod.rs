//! Memory manager abstraction plus [`TestMemoryArena`], a guard-paged
//! bump allocator used by tests to catch overruns and to inject
//! allocation failures deterministically.

use crate::error::Result;
use std::alloc::{GlobalAlloc, Layout};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, OnceLock};

/// A pluggable raw allocator. `kcore`'s numeric types allocate through
/// whatever is currently [`install`]ed rather than calling the global
/// Rust allocator directly, so tests can swap in [`TestMemoryArena`]
/// and exercise fault injection and overrun detection.
///
/// # Safety
/// Implementors must return memory valid for `size` bytes aligned to
/// `align`, and callers must pass the same `(size, align)` pair to
/// `resize`/`free` that `allocate` returned memory for.
pub unsafe trait MemoryManager: Send + Sync {
    unsafe fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>>;
    unsafe fn resize(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize, align: usize) -> Result<NonNull<u8>>;
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, align: usize);
}

/// The ordinary system allocator, wrapped behind [`MemoryManager`] so
/// it can serve as the default installed manager.
struct SystemManager;

unsafe impl MemoryManager for SystemManager {
    unsafe fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>> {
        let layout = Layout::from_size_align(size.max(1), align).unwrap();
        let ptr = std::alloc::System.alloc(layout);
        NonNull::new(ptr).ok_or(crate::error::KernelError::OutOfMemory)
    }
    unsafe fn resize(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize, align: usize) -> Result<NonNull<u8>> {
        let old_layout = Layout::from_size_align(old_size.max(1), align).unwrap();
        let raw = std::alloc::System.realloc(ptr.as_ptr(), old_layout, new_size.max(1));
        NonNull::new(raw).ok_or(crate::error::KernelError::OutOfMemory)
    }
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, align: usize) {
        let layout = Layout::from_size_align(size.max(1), align).unwrap();
        std::alloc::System.dealloc(ptr.as_ptr(), layout);
    }
}

fn registry() -> &'static Mutex<Vec<Arc<dyn MemoryManager>>> {
    static REGISTRY: OnceLock<Mutex<Vec<Arc<dyn MemoryManager>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(vec![Arc::new(SystemManager)]))
}

/// Installs `manager` as the process-wide active memory manager,
/// pushing the previous one onto a stack so [`uninstall`] can restore
/// it (this is how [`TestMemoryArena::switchoff`] finds "the saved
/// previous memory manager").
pub fn install(manager: Arc<dyn MemoryManager>) {
    registry().lock().unwrap().push(manager);
}

/// Restores whatever manager was active before the most recent
/// [`install`]. The initial system manager is never popped.
pub fn uninstall() {
    let mut stack = registry().lock().unwrap();
    if stack.len() > 1 {
        stack.pop();
    }
}

/// Returns the currently active manager.
pub fn current() -> Arc<dyn MemoryManager> {
    Arc::clone(registry().lock().unwrap().last().unwrap())
}

mod arena;
pub use arena::{FaultKind, TestMemoryArena};
