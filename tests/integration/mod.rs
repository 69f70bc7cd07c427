//! Integration test suite for autowire
//!
//! End-to-end tests over real project trees in temporary directories.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolution**: index discovery, caching, aliases, packages and submodules
//! - **injection**: argument assembly, safe/unsafe modes, singletons, deep injection
//! - **composition**: instances, mixins, proxies and cycles
//! - **config**: `autowire.toml` and per-root registry sharing
//! - **cli**: the `autowire` binary

mod cli;
mod composition;
mod injection;
mod resolution;
