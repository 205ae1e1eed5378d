#![forbid(unsafe_code)]
//! ceiba-core: shared vocabulary for the ceiba expression engine.
//!
//! This crate holds the data model every other layer speaks (scalars,
//! columns with an explicit constant representation, data types, fields)
//! plus the canonical error type and the *interfaces* to the function
//! runtime. Concrete functions live in `ceiba-funcs`; the expression DAG
//! that wires them together lives in `ceiba-expr`.
//!
//! No I/O, no async, no allocator tricks here. Pure data and traits.

pub mod error;
pub mod function;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
