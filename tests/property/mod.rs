//! Property-based tests for engine invariants

mod invariants;
