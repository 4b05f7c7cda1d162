//! Descriptor to MongoDB query translation
//!
//! A [`Query`] descriptor carries UI-level keys. A caller-supplied
//! [`FieldMapping`] binds those keys to native field names and
//! [`Operator`]s; keys without a binding are ignored.

pub mod operator;
pub mod pagination;
pub mod query;

pub use operator::{FieldMapping, Filter, Operator};
pub use pagination::{Pagination, DEFAULT_PAGE_SIZE};
pub use query::{Filtered, Query, Sorted};
