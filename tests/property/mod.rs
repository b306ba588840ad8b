// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests
//!
//! - `determinism` - declarations and templates are pure functions of their inputs
//! - `addressing` - subnet allocation and logical ID derivation

mod addressing;
mod determinism;
