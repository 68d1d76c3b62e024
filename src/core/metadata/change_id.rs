//! core::metadata::change_id
//!
//! Change-Id footers for metadata commits.
//!
//! An update may ask for a `Change-Id: I<hex>` footer on every commit it
//! writes. The identifier comes from a [`ChangeIdGenerator`] so hosts with
//! their own id scheme can plug it in; [`HashChangeId`] is the default.

use sha2::{Digest, Sha256};

use crate::core::types::{Oid, PersonIdent};

/// Footer key used for change identifiers.
pub const CHANGE_ID_FOOTER: &str = "Change-Id";

/// Everything known about a commit before it is written.
#[derive(Debug, Clone, Copy)]
pub struct ChangeIdInput<'a> {
    pub tree: &'a Oid,
    pub parent: Option<&'a Oid>,
    pub author: &'a PersonIdent,
    pub committer: &'a PersonIdent,
    pub message: &'a str,
}

/// Source of change identifiers.
pub trait ChangeIdGenerator {
    /// Produce the footer value, including any prefix such as `I`.
    fn generate(&self, input: &ChangeIdInput<'_>) -> String;
}

/// SHA-256 over the commit header fields and message, truncated to 40 hex
/// digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashChangeId;

impl ChangeIdGenerator for HashChangeId {
    fn generate(&self, input: &ChangeIdInput<'_>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("tree {}\n", input.tree));
        if let Some(parent) = input.parent {
            hasher.update(format!("parent {}\n", parent));
        }
        for (role, who) in [("author", input.author), ("committer", input.committer)] {
            hasher.update(format!(
                "{} {} {} {:+05}\n",
                role,
                who,
                who.when.timestamp(),
                who.offset_minutes()
            ));
        }
        hasher.update("\n");
        hasher.update(input.message);

        let digest = hex::encode(hasher.finalize());
        format!("I{}", &digest[..40])
    }
}

impl<F: Fn(&ChangeIdInput<'_>) -> String> ChangeIdGenerator for F {
    fn generate(&self, input: &ChangeIdInput<'_>) -> String {
        self(input)
    }
}

fn is_footer_line(line: &str) -> bool {
    match line.split_once(':') {
        Some((key, rest)) => {
            !key.is_empty()
                && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                && (rest.is_empty() || rest.starts_with(' '))
        }
        None => false,
    }
}

/// Append a `Change-Id` footer unless the message already carries one.
///
/// The footer joins an existing footer paragraph (for example
/// `Signed-off-by:` lines); otherwise it starts a new paragraph.
pub fn insert_change_id(message: &str, change_id: &str) -> String {
    let body = message.trim_end();
    let footer = format!("{}: {}", CHANGE_ID_FOOTER, change_id);
    if body.is_empty() {
        return format!("{}\n", footer);
    }

    let paragraphs: Vec<&str> = body.split("\n\n").collect();
    let last = paragraphs.last().copied().unwrap_or("");
    let prefix = format!("{}:", CHANGE_ID_FOOTER);
    if last.lines().any(|l| l.starts_with(&prefix)) {
        return format!("{}\n", body);
    }

    let joins_footer = paragraphs.len() > 1 && last.lines().all(is_footer_line);
    if joins_footer {
        format!("{}\n{}\n", body, footer)
    } else {
        format!("{}\n\n{}\n", body, footer)
    }
}
