//! # fake-types
//!
//! Wire format types for fake-service.
//!
//! This crate provides the types shared by every fake-service crate:
//! - [`Response`] - A node of the response tree describing one call and its upstreams
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod response;

pub use error::TypesError;
pub use response::{Response, ResponseType};
