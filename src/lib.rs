use std::error::Error;

pub mod config;
pub mod error;
pub mod failures;
pub mod model;
pub mod readwise;
pub mod sync;
pub mod version;
pub mod zotero;

/// Flattens an error and its `source()` chain into "outer: inner: ...".
pub fn unpack_error(err: &(dyn Error + 'static)) -> String {
    std::iter::successors(Some(err), |&e| e.source())
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
