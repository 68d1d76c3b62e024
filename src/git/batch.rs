//! git::batch
//!
//! Atomic multi-ref updates.
//!
//! A [`RefBatch`] collects compare-and-swap commands from several metadata
//! updates and applies them together. Queuing a command does not touch the
//! repository; [`RefBatch::execute`] locks every ref, checks every
//! expectation, and only then moves all of them.
//!
//! # Example
//!
//! ```ignore
//! let batch = RefBatch::new();
//! batch.add_command(RefCommand::new(refname, old, new));
//! let results = batch.execute(&git, "update metadata", None)?;
//! ```

use std::cell::{Cell, RefCell};

use super::interface::{raw_oid, signature, Git, GitError, RefUpdateResult};
use crate::core::types::{Oid, PersonIdent, RefName};

/// A single queued ref transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefCommand {
    pub ref_name: RefName,
    /// Expected current value; zero means the ref must not exist.
    pub old_id: Oid,
    pub new_id: Oid,
}

impl RefCommand {
    pub fn new(ref_name: RefName, old_id: Oid, new_id: Oid) -> Self {
        Self {
            ref_name,
            old_id,
            new_id,
        }
    }
}

/// Ref transitions to be applied atomically.
///
/// The batch is shared by reference between the updates that feed it, so
/// commands are queued through `&self`.
#[derive(Debug, Default)]
pub struct RefBatch {
    commands: RefCell<Vec<RefCommand>>,
    allow_non_fast_forwards: Cell<bool>,
}

impl RefBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transition.
    pub fn add_command(&self, command: RefCommand) {
        log::debug!(
            "queued {} {} -> {}",
            command.ref_name,
            command.old_id.short(7),
            command.new_id.short(7)
        );
        self.commands.borrow_mut().push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }

    pub fn set_allow_non_fast_forwards(&self, allow: bool) {
        self.allow_non_fast_forwards.set(allow);
    }

    pub fn allow_non_fast_forwards(&self) -> bool {
        self.allow_non_fast_forwards.get()
    }

    /// Apply every queued transition, or none of them.
    ///
    /// Several commands for the same ref are collapsed: the first command's
    /// expected value must hold and the last command's new value is stored.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if any ref does not hold its expected value
    /// - [`GitError::UpdateRejected`] if any transition is otherwise refused
    pub fn execute(
        &self,
        git: &Git,
        reflog_message: &str,
        ident: Option<&PersonIdent>,
    ) -> Result<Vec<(RefName, RefUpdateResult)>, GitError> {
        let commands = self.collapsed();
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = git.repo.transaction().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        for command in &commands {
            let name = command.ref_name.as_str();
            tx.lock_ref(name).map_err(|e| GitError::AccessError {
                message: format!("cannot lock {}: {}", name, e.message()),
            })?;
        }

        let mut results = Vec::with_capacity(commands.len());
        for command in &commands {
            let name = command.ref_name.as_str();
            let current = git.try_resolve_ref(name)?;
            let result = git.classify_update(
                current.as_ref(),
                &command.old_id,
                &command.new_id,
                self.allow_non_fast_forwards(),
            )?;
            match result {
                RefUpdateResult::LockFailure => {
                    return Err(GitError::CasFailed {
                        refname: name.to_string(),
                        expected: command.old_id.to_string(),
                        actual: current.map(|o| o.to_string()).unwrap_or_else(|| "none".into()),
                    });
                }
                r if r.is_success() || r == RefUpdateResult::NoChange => {}
                r => {
                    return Err(GitError::UpdateRejected {
                        refname: name.to_string(),
                        result: r,
                    });
                }
            }
            results.push((command.ref_name.clone(), result));
        }

        let sig = ident.map(signature).transpose()?;
        for command in &commands {
            let name = command.ref_name.as_str();
            tx.set_target(name, raw_oid(&command.new_id)?, sig.as_ref(), reflog_message)
                .map_err(|e| GitError::from_git2(e, name))?;
        }
        tx.commit().map_err(|e| GitError::AccessError {
            message: format!("cannot apply ref batch: {}", e.message()),
        })?;
        for (command, (_, result)) in commands.iter().zip(&results) {
            if *result != RefUpdateResult::NoChange {
                git.append_reflog(
                    command.ref_name.as_str(),
                    &command.new_id,
                    ident,
                    reflog_message,
                )?;
            }
        }

        log::debug!("applied {} ref updates", results.len());
        self.commands.borrow_mut().clear();
        Ok(results)
    }

    fn collapsed(&self) -> Vec<RefCommand> {
        let mut out: Vec<RefCommand> = Vec::new();
        for command in self.commands.borrow().iter() {
            match out.iter_mut().find(|c| c.ref_name == command.ref_name) {
                Some(existing) => existing.new_id = command.new_id.clone(),
                None => out.push(command.clone()),
            }
        }
        out
    }
}
