//! Benchmark utilities for Strata.
//!
//! - **Components**: representative component types and a registry built from them
//! - **Fixtures**: pre-populated stores and seeded shuffles for delete/transition orders
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p strata_bench
//!
//! # Run specific benchmark group
//! cargo bench -p strata_bench -- create
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports for visualization.

pub mod components;
pub mod fixtures;
