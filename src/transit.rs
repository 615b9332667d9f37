//! Transit JSON codec.
//!
//! The query API speaks `application/transit+json`: values are carried in
//! plain JSON, with maps written as `["^ ", k, v, ...]`, typed scalars as
//! `~`-prefixed strings and repeated keys replaced by `^N` cache references.

pub mod lookup;
mod read;
mod value;
mod write;

pub use lookup::field_by_name;
pub use read::{decode, decode_json};
pub use value::{Keyword, Symbol, TransitMap, Value};
pub use write::{encode, to_json};

/// Media type used for both request and response bodies.
pub const MEDIA_TYPE: &str = "application/transit+json";
