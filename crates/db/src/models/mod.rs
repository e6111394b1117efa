//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` struct matching the database row
//! - Its conversion into the `levelup-core` domain type
//! - `Deserialize` create / update DTOs where the table takes writes

pub mod achievement;
pub mod task;
pub mod user;
