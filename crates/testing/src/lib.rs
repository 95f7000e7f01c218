//! Test harnesses exercising `kcore`: concurrency stress scenarios over
//! the thread runtime, property-based invariant checks over the
//! numeric kernels, and memory-arena fault-injection/corruption
//! scenarios.
//!
//! Each module corresponds to one family of testable properties from
//! the core design rather than to a test framework feature; see the
//! module docs for which properties each one checks.

pub mod concurrency;
pub mod security;

#[cfg(all(test, feature = "property-based-tests"))]
pub mod property_based;

#[cfg(feature = "formal-verification")]
pub mod formal;

/// Runs a small end-to-end smoke scenario across the numeric kernels
/// and the thread runtime, aggregating whatever step fails into one
/// report. Harness-level code like this owns `anyhow`, the same split
/// the library crates it drives keep between a concrete error enum
/// (`kcore::KernelError`) and a caller-facing aggregate.
pub fn run_smoke_scenario() -> anyhow::Result<()> {
    use kcore::mem::{MemoryManager, TestMemoryArena};
    use kcore::sync::Mutex;

    let _ = env_logger::try_init();

    let a = kcore::decimal::from_str("1.23456789")?;
    let b = kcore::decimal::from_str("9.87654322")?;
    let mut product = kcore::decimal::Decimal::zero();
    kcore::decimal::mul(&mut product, &a, &b)?;
    anyhow::ensure!(
        kcore::decimal::to_string(&product) == "11.11111111",
        "decimal multiply regressed: got {}",
        kcore::decimal::to_string(&product)
    );

    let counter = Mutex::new(0u32);
    *counter.lock()? += 1;
    anyhow::ensure!(*counter.lock()? == 1, "mutex-guarded counter did not update");

    let arena = TestMemoryArena::new(4096)?;
    unsafe {
        let ptr = arena.allocate(32, 8)?;
        arena.free(ptr, 32, 8);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn smoke_scenario_succeeds() {
        super::run_smoke_scenario().unwrap();
    }
}
