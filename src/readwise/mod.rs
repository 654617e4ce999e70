//! Readwise Module
//!
//! Converts [`NormalizedItem`](crate::model::NormalizedItem)s into Readwise
//! highlights and uploads them in one batch.
//!
//! # Architecture
//!
//! - `HighlightConverter` builds a `Highlight` per item: note text from tags
//!   and comment, page location, category, and a `zotero://` deep link when the
//!   document has a PDF attachment
//! - items over the Readwise character ceiling are rejected before conversion
//!   and reported as failures, never uploaded
//! - `ReadwiseClient` posts the batch; a non-success response is fatal and its
//!   body is dumped to an error log
//!
//! # Usage
//!
//! ```rust,ignore
//! use zotwise::readwise::{HighlightConverter, ReadwiseClient};
//!
//! let outcome = HighlightConverter::new(custom_tag).convert_batch(&items);
//! client.create_highlights(&outcome.highlights).await?;
//! ```

mod client;
mod convert;
mod highlight;

pub use client::{ReadwiseClient, ReadwiseConfig};
pub use convert::{ConvertOutcome, HighlightConverter, MAX_HIGHLIGHT_LENGTH, sanitize_tag};
pub use highlight::{Category, Highlight};
