//! Marketplace operations.
//!
//! Each operation takes its collaborators explicitly: the storage client, and
//! where needed the image store and event publisher.

pub mod accounts;
pub mod catalog;
pub mod orders;
pub mod vendors;

#[cfg(test)]
pub(crate) mod fixtures;
