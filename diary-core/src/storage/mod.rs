//! Storage module
//!
//! Provides blob storage for attachment files.

pub mod blob_store;

#[cfg(test)]
pub(crate) mod testing;

pub use blob_store::BlobStore;
