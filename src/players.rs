use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::identity::performer_token;
use crate::model::{NormalizedRun, Performer};

/// identity → performer descriptors, as written to the metadata bundle.
pub type PlayerDirectory = BTreeMap<String, Vec<Value>>;

const STRIPPED_KEYS: &[&str] = &["links"];
const STRIPPED_ACCOUNT_KEYS: &[&str] = &["role", "signup"];

/// Built from dated runs only, so every key is also a timeline column.
pub fn build_player_directory(runs: &[NormalizedRun]) -> PlayerDirectory {
    let mut directory = PlayerDirectory::new();
    for run in runs.iter().filter(|r| r.performed_date.is_some()) {
        let mut seen = HashSet::new();
        let descriptors = run
            .performers
            .iter()
            .filter(|p| seen.insert(performer_token(&p.kind)))
            .map(public_descriptor)
            .collect();
        directory.insert(run.identity.clone(), descriptors);
    }
    directory
}

/// Copy of the performer's descriptor without account-management fields.
pub fn public_descriptor(performer: &Performer) -> Value {
    let mut descriptor = performer.descriptor.clone();
    if let Value::Object(map) = &mut descriptor {
        for key in STRIPPED_KEYS {
            map.remove(*key);
        }
        if performer.is_account() {
            for key in STRIPPED_ACCOUNT_KEYS {
                map.remove(*key);
            }
        }
    }
    descriptor
}
