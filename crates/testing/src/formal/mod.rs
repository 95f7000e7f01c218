//! Bounded model-checking harnesses for the handful of invariants that
//! are cheap to state and expensive to miss with testing alone:
//! `BigInt`'s canonical-form invariant and `Decimal`'s digit-range
//! invariant. Gated behind `formal-verification`; the proof harnesses
//! themselves only run under `cargo kani` (`#[cfg(kani)]`).

pub mod kani_integration;
