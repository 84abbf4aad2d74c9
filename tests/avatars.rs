use std::collections::HashMap;
use std::fs;

use chrono::NaiveDate;
use serde_json::{Value, json};
use tempfile::TempDir;

use pb_timeline::assets::AssetLayout;
use pb_timeline::avatars::{AvatarChain, AvatarStrategy, avatar_candidates, parse_chain};
use pb_timeline::identity::identity_of_performers;
use pb_timeline::model::{NormalizedRun, Performer};
use pb_timeline::session::SessionCache;
use pb_timeline::timeline::aggregate;

fn run(id: &str, identity: &str, secs: f64, day: u32) -> NormalizedRun {
    NormalizedRun {
        id: id.to_string(),
        identity: identity.to_string(),
        elapsed_seconds: secs,
        time_display: format!("{secs}"),
        performed_date: NaiveDate::from_ymd_opt(2021, 3, day),
        comment: None,
        display_names: Vec::new(),
        performers: Vec::new(),
        video_links: Vec::new(),
        extended: None,
    }
}

fn candidate_ids(runs: &[NormalizedRun], limit: usize) -> Vec<String> {
    let agg = aggregate(runs).expect("dated runs");
    let by_id = runs
        .iter()
        .map(|r| (r.id.as_str(), r))
        .collect::<HashMap<_, _>>();
    avatar_candidates(&agg.timeline, &by_id, limit)
        .into_iter()
        .map(|r| r.id.clone())
        .collect()
}

#[test]
fn fastest_per_row_in_first_seen_order() {
    let runs = vec![
        run("c1", "c-", 300.0, 1),
        run("b1", "b-", 200.0, 1),
        run("a1", "a-", 100.0, 2),
        run("c2", "c-", 50.0, 3),
    ];
    // day 1: b1, c1 / day 2: a1, b1 / day 3: c2, a1
    assert_eq!(candidate_ids(&runs, 1), vec!["b1", "a1", "c2"]);
    assert_eq!(candidate_ids(&runs, 2), vec!["b1", "c1", "a1", "c2"]);
}

#[test]
fn zero_limit_disables_candidates() {
    let runs = vec![run("a1", "a-", 100.0, 1)];
    assert!(candidate_ids(&runs, 0).is_empty());
}

#[test]
fn default_chain_matches_flag_default() {
    let chain = parse_chain("profile,twitch,youtube,vod").expect("valid chain");
    assert_eq!(chain, AvatarStrategy::DEFAULT_CHAIN.to_vec());
    assert_eq!(
        chain.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        vec!["profile", "twitch", "youtube", "vod"]
    );
}

fn account(id: &str, weblink: bool) -> Value {
    let mut descriptor = json!({"rel": "user", "id": id, "names": {"international": id}});
    if weblink {
        descriptor["weblink"] = json!(format!("https://www.speedrun.com/user/{id}"));
    }
    descriptor
}

fn performed(id: &str, descriptors: &[Value], video_links: &[&str]) -> NormalizedRun {
    let performers = descriptors
        .iter()
        .map(Performer::from_value)
        .collect::<anyhow::Result<Vec<_>>>()
        .expect("valid performers");
    let mut record = run(id, &identity_of_performers(&performers), 60.0, 1);
    record.display_names = performers.iter().map(|p| p.display_name.clone()).collect();
    record.performers = performers;
    record.video_links = video_links.iter().map(|l| l.to_string()).collect();
    record
}

fn layout_with_avatars(identities: &[&str]) -> (TempDir, AssetLayout) {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = AssetLayout::new(dir.path().join("pfps"), dir.path().join("flags"));
    layout.ensure_dirs().expect("asset dirs");
    for identity in identities {
        fs::write(layout.avatar_path(identity), b"png").expect("seed avatar");
    }
    (dir, layout)
}

fn offline_chain(strategies: Vec<AvatarStrategy>) -> AvatarChain {
    AvatarChain::new(strategies, None, None)
}

#[test]
fn avatar_on_disk_counts_as_resolved() {
    let (_dir, layout) = layout_with_avatars(&["u1-"]);
    let solo = performed("r1", &[account("u1", true)], &[]);
    let mut session = SessionCache::new();

    let mut chain = offline_chain(vec![AvatarStrategy::Profile]);
    let resolved = chain.resolve(&[&solo], &layout, &mut session);
    assert_eq!(resolved, 1);
    assert_eq!(session.avatars(), ["u1-"]);
}

#[test]
fn identity_goes_through_the_chain_once() {
    let (_dir, layout) = layout_with_avatars(&["u1-"]);
    let first = performed("r1", &[account("u1", true)], &[]);
    let second = performed("r2", &[account("u1", true)], &[]);
    let mut session = SessionCache::new();
    let mut chain = offline_chain(AvatarStrategy::DEFAULT_CHAIN.to_vec());

    let resolved = chain.resolve(&[&first, &first, &second], &layout, &mut session);
    assert_eq!(resolved, 1);
    assert!(!session.begin_identity_lookup("u1-"));
    assert_eq!(chain.resolve(&[&second], &layout, &mut session), 0);
    assert_eq!(session.avatars(), ["u1-"]);
}

#[test]
fn video_links_are_scanned_once_per_run() {
    let (_dir, layout) = layout_with_avatars(&[]);
    let run = performed(
        "r9",
        &[account("u9", false)],
        &["https://www.twitch.tv/videos/1234567890"],
    );
    let mut session = SessionCache::new();
    let mut chain = offline_chain(vec![AvatarStrategy::Vod]);

    assert_eq!(chain.resolve(&[&run], &layout, &mut session), 0);
    assert!(!session.begin_vod_scan("r9"));
    assert!(session.avatars().is_empty());
}

#[test]
fn team_and_unlinked_runs_skip_identity_strategies() {
    let team = performed("t1", &[account("u1", true), account("u2", true)], &[]);
    let unlinked = performed("r3", &[account("u3", false)], &[]);
    let guest = performed("g1", &[json!({"rel": "guest", "name": "Bob"})], &[]);
    let (_dir, layout) = layout_with_avatars(&[
        team.identity.as_str(),
        unlinked.identity.as_str(),
        guest.identity.as_str(),
    ]);
    let mut session = SessionCache::new();

    let resolved = offline_chain(AvatarStrategy::DEFAULT_CHAIN.to_vec()).resolve(
        &[&team, &unlinked, &guest],
        &layout,
        &mut session,
    );
    assert_eq!(resolved, 0);
    assert!(session.avatars().is_empty());
}

#[test]
fn vod_only_chain_ignores_solo_run_without_links() {
    let (_dir, layout) = layout_with_avatars(&["u1-"]);
    let solo = performed("r1", &[account("u1", true)], &[]);
    let mut session = SessionCache::new();

    let mut chain = offline_chain(vec![AvatarStrategy::Vod]);
    let resolved = chain.resolve(&[&solo], &layout, &mut session);
    assert_eq!(resolved, 0);
    assert!(!session.has_avatar("u1-"));
    assert!(session.begin_vod_scan("r1"));
}
