//! Explorer API wire model
//!
//! Shared by every explorer front-end. Contains only types and pure
//! decoding functions; HTTP transport lives in the UI crate.

pub mod types;

pub use types::{
    decode_page, decode_search, ApiEnvelope, PageResult, PaginatedData, PaginationMetadata,
    SearchOutcome, ShapeError,
};
