// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Entry Point
//!
//! Runs the proptest suites under `tests/property/`.

mod property;
