//! core::metadata::rewriter
//!
//! History rewrites of a metadata ref.

use super::error::MetaDataError;
use crate::core::types::Oid;
use crate::git::Git;

/// Produces a replacement history for a metadata ref.
///
/// Implementations read the chain ending at `current_tip`, write whatever
/// new commits they need, and return the tip of the replacement chain.
/// Returning `current_tip` itself means nothing changed. The ref is not
/// moved here; the session that invoked the rewrite publishes the result.
pub trait VersionedMetaDataRewriter {
    fn rewrite_commit_history(
        &mut self,
        git: &Git,
        current_tip: &Oid,
    ) -> Result<Oid, MetaDataError>;
}

impl<F> VersionedMetaDataRewriter for F
where
    F: FnMut(&Git, &Oid) -> Result<Oid, MetaDataError>,
{
    fn rewrite_commit_history(
        &mut self,
        git: &Git,
        current_tip: &Oid,
    ) -> Result<Oid, MetaDataError> {
        self(git, current_tip)
    }
}
