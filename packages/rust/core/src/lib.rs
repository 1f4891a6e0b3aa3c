//! Core pipeline orchestration for tagtree.
//!
//! This crate ties together source adapters, canonical serialization and
//! tree assembly into one end-to-end import run (see [`pipeline::run_import`]).

pub mod pipeline;
