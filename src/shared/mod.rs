// Shared kernel - errors, constants, value types and small helpers

pub mod constants;
pub mod error;
pub mod types;
pub mod utils;
