//! Metaref - transactional metadata stored in git refs
//!
//! Metaref keeps structured server metadata (project configuration, access
//! rules, group membership files) as ordinary commits under dedicated refs
//! of a git repository. Each update becomes a commit; the ref history is
//! the audit log; concurrent writers are caught by compare-and-swap on the
//! ref.
//!
//! # Architecture
//!
//! - [`core`] - Domain types, configuration, and the metadata engine
//! - [`git`] - Single interface for all Git operations
//!
//! # Correctness Invariants
//!
//! 1. A ref only moves from the revision the writer loaded
//! 2. Drafted commits are invisible until the session publishes them
//! 3. A batch of ref updates applies completely or not at all

pub mod core;
pub mod git;
