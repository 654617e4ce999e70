//! Zotero Module
//!
//! Reads annotations and notes out of a Zotero library and normalizes them into
//! [`NormalizedItem`](crate::model::NormalizedItem)s ready for conversion.
//!
//! # Architecture
//!
//! - `SourceClient` is the only seam to the Zotero web API; `ZoteroClient` is the
//!   `reqwest` implementation
//! - `MetadataResolver` walks an annotation's parent chain (attachment, then
//!   top-level document) and caches document metadata per run
//! - `Normalizer` filters, dispatches on item kind, validates and sorts
//!
//! # Usage
//!
//! ```rust,ignore
//! use zotwise::zotero::{ItemFilter, Normalizer, ZoteroClient};
//!
//! let client = ZoteroClient::new(config)?;
//! let records = client.items("annotation", 0).await?;
//! let mut normalizer = Normalizer::new(&client);
//! let outcome = normalizer.normalize_batch(&records, &ItemFilter::default()).await;
//! ```

mod client;
mod metadata;
mod normalize;

pub use client::{LibraryType, SourceClient, ZoteroClient, ZoteroConfig};
pub use metadata::MetadataResolver;
pub use normalize::{ItemFilter, ItemKind, NormalizeOutcome, Normalizer, format_author_list};
