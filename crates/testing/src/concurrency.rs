//! Stress scenarios for the mutex and wait-list: a synchronized
//! counter under contention, and a FIFO wake-order check over a
//! larger wait list than `kcore`'s own unit tests use.
