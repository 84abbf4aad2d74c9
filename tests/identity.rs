use serde_json::json;

use pb_timeline::identity::{guest_hash, identity_of, identity_of_performers, performer_token};
use pb_timeline::model::{Performer, PerformerKind};

fn account(id: &str) -> PerformerKind {
    PerformerKind::Account { id: id.to_string() }
}

fn guest(name: &str) -> PerformerKind {
    PerformerKind::Guest {
        name: name.to_string(),
    }
}

#[test]
fn guest_hashes_are_stable() {
    assert_eq!(guest_hash("Alice"), "hpcrayux");
    assert_eq!(guest_hash("GuestRunner"), "baotj8o5");
    assert_eq!(guest_hash("Bob"), "zwp3dyk8");
    assert_eq!(performer_token(&guest("Bob")), "zwp3dyk8_");
}

#[test]
fn identity_ignores_performer_order() {
    let forward = [account("x7q2ab9e"), guest("Bob"), account("0kj1ee8d")];
    let backward = [account("0kj1ee8d"), guest("Bob"), account("x7q2ab9e")];
    let id = identity_of(&forward);
    assert_eq!(id, identity_of(&backward));
    assert_eq!(id, "0kj1ee8d-x7q2ab9e-zwp3dyk8_");
}

#[test]
fn account_and_guest_with_same_text_differ() {
    assert_ne!(identity_of(&[account("Alice")]), identity_of(&[guest("Alice")]));
    assert_eq!(identity_of(&[account("Alice")]), "Alice-");
    assert_eq!(identity_of(&[guest("Alice")]), "hpcrayux_");
}

#[test]
fn solo_identity_is_the_single_token() {
    assert_eq!(identity_of(&[account("u1")]), performer_token(&account("u1")));
}

#[test]
fn identity_from_parsed_performers() {
    let performers = [
        json!({"rel": "guest", "name": "Bob"}),
        json!({"rel": "user", "id": "u2", "names": {"international": "Chloé"}}),
    ]
    .iter()
    .map(Performer::from_value)
    .collect::<anyhow::Result<Vec<_>>>()
    .expect("valid performers");
    assert_eq!(identity_of_performers(&performers), "u2-zwp3dyk8_");
}

#[test]
fn guest_names_are_hashed_as_stored() {
    let padded = Performer::from_value(&json!({"rel": "guest", "name": "Bob "}))
        .expect("guest with trailing space");
    assert_eq!(padded.display_name, "Bob ");
    assert_eq!(identity_of_performers(&[padded]), "urk3lrye_");

    let blank = Performer::from_value(&json!({"rel": "guest", "name": "  "}))
        .expect("whitespace name is still a name");
    assert_eq!(identity_of_performers(&[blank]), "nqlz68pg_");
}

#[test]
fn guest_without_string_name_is_rejected() {
    assert!(Performer::from_value(&json!({"rel": "guest"})).is_err());
    assert!(Performer::from_value(&json!({"rel": "guest", "name": 42})).is_err());
}
