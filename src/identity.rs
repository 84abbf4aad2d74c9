//! Stable column keys for runners and teams.
//!
//! An account performer contributes `<account id>-`; a guest contributes an
//! eight character hash of its display name followed by `_`. A team identity
//! is the sorted concatenation of its members' tokens, so the same set of
//! performers always lands in the same column regardless of listing order.

use data_encoding::BASE32;
use sha2::{Digest, Sha256};

use crate::model::{Performer, PerformerKind};

pub const ACCOUNT_SUFFIX: char = '-';
pub const GUEST_SUFFIX: char = '_';

const GUEST_HASH_LEN: usize = 8;

/// SHA-256 of the UTF-8 name, base-32, first eight symbols, lowercased,
/// with `i` swapped for `8`. Existing output files depend on this exact
/// sequence.
pub fn guest_hash(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    let encoded = BASE32.encode(&digest);
    encoded[..GUEST_HASH_LEN]
        .to_ascii_lowercase()
        .replace('i', "8")
}

pub fn performer_token(kind: &PerformerKind) -> String {
    match kind {
        PerformerKind::Account { id } => format!("{id}{ACCOUNT_SUFFIX}"),
        PerformerKind::Guest { name } => format!("{}{GUEST_SUFFIX}", guest_hash(name)),
    }
}

pub fn identity_of<'a, I>(kinds: I) -> String
where
    I: IntoIterator<Item = &'a PerformerKind>,
{
    let mut tokens = kinds.into_iter().map(performer_token).collect::<Vec<_>>();
    tokens.sort();
    tokens.concat()
}

pub fn identity_of_performers(performers: &[Performer]) -> String {
    identity_of(performers.iter().map(|p| &p.kind))
}

#[cfg(test)]
mod tests {
    use super::{guest_hash, performer_token};
    use crate::model::PerformerKind;

    #[test]
    fn guest_hash_is_fixed_width_lowercase_without_i() {
        for name in ["Alice", "bob the runner", "日本語", ""] {
            let hash = guest_hash(name);
            assert_eq!(hash.len(), 8);
            assert!(!hash.contains('i'));
            assert!(
                hash.chars()
                    .all(|c| c.is_ascii_lowercase() || ('2'..='8').contains(&c))
            );
        }
    }

    #[test]
    fn guest_hash_of_empty_name_matches_known_digest() {
        // sha256("") = e3b0c442..., base32 "4OYMIQUY..."
        assert_eq!(guest_hash(""), "4oym8quy");
    }

    #[test]
    fn tokens_carry_distinct_suffixes() {
        let account = performer_token(&PerformerKind::Account {
            id: "x7q2ab9e".to_string(),
        });
        let guest = performer_token(&PerformerKind::Guest {
            name: "x7q2ab9e".to_string(),
        });
        assert_eq!(account, "x7q2ab9e-");
        assert!(guest.ends_with('_'));
        assert_ne!(account, guest);
    }
}
