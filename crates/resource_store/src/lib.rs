//! Lookup of named resources, such as seed datasets, by logical path.
//!
//! A [ResourceStore] sits on top of one backing store.  Keys are `/`-separated paths relative to the root of the store,
//! e.g. `datasets/users.json`.  A missing key is always reported as [std::io::ErrorKind::NotFound], so that callers can
//! tell "this store doesn't have it" apart from a real I/O failure and fall back to some other lookup.
mod backing_stores;
mod resource_store;

pub use resource_store::*;
