//! Synchronization primitives the thread runtime is built from: an
//! error-checking mutex, a process-wide real-time signal registry, and
//! a FIFO wait list composed from the two.

pub mod mutex;
pub mod rtsignal;
pub mod waitlist;

pub use mutex::Mutex;
pub use rtsignal::RtSignals;
pub use waitlist::WaitList;
