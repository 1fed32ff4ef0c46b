//! compiler error types.

use thiserror::Error;

/// errors that can occur while compiling stored records.
#[derive(Debug, Error)]
pub enum Error {
    /// a stored opaque payload is not lexically valid JSON and cannot be
    /// embedded in the compiled document. the payload is never repaired
    /// or partially emitted; the bad record surfaces to the caller.
    #[error("malformed stored JSON in `{field}` of \"{tag}\": {source}")]
    MalformedStoredConfig {
        /// tag of the record carrying the payload.
        tag: String,
        /// which field was malformed.
        field: &'static str,
        /// the underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
