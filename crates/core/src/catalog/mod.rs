//! Supplier catalog documents.
//!
//! Shops publish their goods as a YAML document. The service parses it into
//! an [`ImportDocument`], validates it here, and only then opens a database
//! transaction to upsert the catalog.

pub mod document;

pub use document::{CategoryEntry, GoodsEntry, ImportDocument, ImportError, ParameterValue};
