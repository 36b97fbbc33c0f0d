//! Shared helpers for the test targets.

#![allow(dead_code)]

pub mod fixtures;
