//! Retrieve anonymously addressed messages from a shared newsgroup.
//!
//! Articles are picked out by Subject alone, using plain labels, hashed
//! subjects (hsub) or encrypted subjects (esub), and matched articles are
//! written to Maildir and/or mbox.

pub mod config;
pub mod daemon;
pub mod delivery;
pub mod domain;
pub mod error;
pub mod matching;
pub mod news;
pub mod retrieval;
pub mod store;
