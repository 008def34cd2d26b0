//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain records are returned as they are; these types cover request
//! bodies, query strings, and the few composite responses.

pub mod allocation_dto;
pub mod common_dto;
pub mod inventory_dto;
pub mod registration_dto;

pub use allocation_dto::*;
pub use common_dto::*;
pub use inventory_dto::*;
pub use registration_dto::*;
