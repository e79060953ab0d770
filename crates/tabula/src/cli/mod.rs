//! Command implementations for the `tabula` binary.

pub mod compare;
pub mod config;
pub mod cross_check;
pub mod extract;
