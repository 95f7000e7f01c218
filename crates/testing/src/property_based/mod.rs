//! Property-based checks over `kcore`'s numeric kernels, generating
//! random inputs with `proptest` rather than enumerating fixed cases.

pub mod invariants;
