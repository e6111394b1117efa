//! Authentication primitives.
//!
//! Token issuance belongs to the identity service; this crate only validates
//! the HS256 access tokens it hands out.

pub mod jwt;
