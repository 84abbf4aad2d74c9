use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};

use pb_timeline::model::Performer;
use pb_timeline::src_api::{
    ApiError, RUNS_PAGE_SIZE, RunsPager, parse_api_response, parse_runs_page_json,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_runs_page_fixture() {
    let raw = read_fixture("runs_page.json");
    let runs = parse_runs_page_json(&raw).expect("fixture should parse");
    assert_eq!(runs.len(), 5);

    let first = &runs[0];
    assert_eq!(first.id, "r1");
    assert_eq!(first.times.primary_t, 100.5);
    assert_eq!(first.date.as_deref(), Some("2024-01-01"));
    assert_eq!(
        first.status.verify_date.as_deref(),
        Some("2024-01-05T08:00:00Z")
    );
    assert_eq!(first.region_name().as_deref(), Some("PAL"));
    assert_eq!(first.platform_name().as_deref(), Some("Nintendo 64"));
    assert_eq!(first.category_label().as_deref(), Some("cat1"));
    assert_eq!(
        first.video_links(),
        vec!["https://www.twitch.tv/videos/1234567890".to_string()]
    );
    assert_eq!(first.performer_values().len(), 1);
}

#[test]
fn absent_optional_fields_degrade_to_empty() {
    let raw = read_fixture("runs_page.json");
    let runs = parse_runs_page_json(&raw).expect("fixture should parse");

    let guest_run = &runs[1];
    assert!(guest_run.date.is_none());
    assert!(guest_run.values.is_empty());
    assert!(guest_run.video_links().is_empty());
    assert!(guest_run.region_name().is_none());
    assert!(guest_run.system.emulated);
    assert!(guest_run.status.verify_date.is_none());

    let team_run = &runs[3];
    assert!(team_run.submitted.is_none());
    assert_eq!(team_run.performer_values().len(), 2);
}

#[test]
fn performers_parse_accounts_and_guests() {
    let raw = read_fixture("runs_page.json");
    let runs = parse_runs_page_json(&raw).expect("fixture should parse");

    let alice = Performer::from_value(&runs[0].performer_values()[0]).expect("account");
    assert!(alice.is_account());
    assert_eq!(alice.display_name, "Alice");
    assert_eq!(alice.country.as_deref(), Some("se"));
    assert_eq!(alice.twitch_uri.as_deref(), Some("https://www.twitch.tv/alice"));
    assert!(alice.youtube_uri.is_none());

    let guest = Performer::from_value(&runs[1].performer_values()[0]).expect("guest");
    assert!(!guest.is_account());
    assert_eq!(guest.display_name, "GuestRunner");
    assert!(guest.weblink.is_none());
}

#[test]
fn empty_runs_page_is_empty() {
    let runs = parse_runs_page_json(r#"{"data": [], "pagination": {"size": 0}}"#)
        .expect("empty page should parse");
    assert!(runs.is_empty());
}

#[test]
fn missing_primary_time_is_an_error() {
    let raw = r#"{"data": [{"id": "x", "times": {"realtime_t": 12.0}}]}"#;
    assert!(parse_runs_page_json(raw).is_err());
}

#[test]
fn error_payloads_surface_status_and_message() {
    let err = parse_api_response(400, r#"{"status": 400, "message": "Invalid offset"}"#)
        .expect_err("non-200 should fail");
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message.as_deref(), Some("Invalid offset"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn page_data(raw: &str) -> Value {
    parse_api_response(200, raw).expect("page has data")
}

#[test]
fn short_page_ends_paging_and_tags_category() {
    let mut pager = RunsPager::new("120 Star");
    pager
        .accept(Ok(page_data(&read_fixture("runs_page.json"))))
        .expect("page accepted");

    assert!(pager.is_done());
    assert_eq!(pager.offset(), RUNS_PAGE_SIZE);
    let runs = pager.into_runs();
    assert_eq!(runs.len(), 5);
    assert!(runs.iter().all(|r| r.category_name.as_deref() == Some("120 Star")));
    assert_eq!(runs[0].category_label().as_deref(), Some("120 Star"));
}

#[test]
fn full_page_asks_for_the_next_offset() {
    let run = json!({"id": "r", "times": {"primary_t": 10.0}});
    let full = Value::Array(vec![run; RUNS_PAGE_SIZE]);

    let mut pager = RunsPager::new("Any%");
    pager.accept(Ok(full)).expect("page accepted");
    assert!(!pager.is_done());
    assert_eq!(pager.offset(), RUNS_PAGE_SIZE);
    assert_eq!(pager.fetched(), RUNS_PAGE_SIZE);

    let empty = parse_api_response(200, r#"{"data": []}"#);
    pager.accept(empty).expect("no results ends paging");
    assert!(pager.is_done());
    assert_eq!(pager.fetched(), RUNS_PAGE_SIZE);
}

#[test]
fn failed_page_is_an_error() {
    let mut pager = RunsPager::new("Any%");
    let failed = parse_api_response(503, r#"{"status": 503, "message": "Unavailable"}"#);
    let err = pager.accept(failed).expect_err("status error surfaces");
    assert_eq!(err.to_string(), "503: Unavailable");
    assert!(!pager.is_done());
    assert_eq!(pager.offset(), 0);
}
