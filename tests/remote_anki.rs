//! The AnkiConnect client against a local HTTP stub.

mod common;

use common::http::{StubServer, fake_anki, ok, rpc_error};
use deck_sync::config::SyncConfig;
use deck_sync::error::SyncError;
use deck_sync::model::{Decision, ItemType};
use deck_sync::remote::{AnkiConnect, CardStore, NewItem, require_item_types};
use deck_sync::sync::ExistingIndex;
use serde_json::json;
use std::time::Duration;

fn client_for(server: &StubServer) -> AnkiConnect {
    let config = SyncConfig {
        endpoint: server.url.clone(),
        timeout: Duration::from_secs(5),
        health_timeout: Duration::from_secs(2),
        ..SyncConfig::default()
    };
    AnkiConnect::new(&config).unwrap()
}

#[test]
fn health_check_requires_status_200() {
    let healthy = StubServer::start(|_| (200, "\"AnkiConnect v.6\"".to_string()));
    assert!(client_for(&healthy).health_check());

    let missing = StubServer::start(|_| (404, "{}".to_string()));
    let client = client_for(&missing);
    assert!(!client.health_check());
    assert!(matches!(
        client.ensure_reachable(),
        Err(SyncError::Unreachable { .. })
    ));
}

#[test]
fn unreachable_endpoint_fails_health_check() {
    let config = SyncConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        ..SyncConfig::default()
    };
    let client = AnkiConnect::new(&config).unwrap();
    assert!(!client.health_check());
}

#[test]
fn requests_carry_action_version_and_params() {
    let server = StubServer::start(|_| ok(json!([11, 12])));
    let client = client_for(&server);

    let ids = client.find_items("Front:*").unwrap();

    assert_eq!(ids, vec![11, 12]);
    let requests = server.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(
        requests[0].body,
        json!({ "action": "findNotes", "version": 6, "params": { "query": "Front:*" } })
    );
}

#[test]
fn error_field_becomes_remote_error() {
    let server = StubServer::start(|_| rpc_error("deck was not found"));
    let client = client_for(&server);

    let err = client.create_collection("Nowhere").unwrap_err();

    match err {
        SyncError::Remote { action, message } => {
            assert_eq!(action, "createDeck");
            assert_eq!(message, "deck was not found");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn http_error_status_is_a_transport_error() {
    let server = StubServer::start(|_| (500, "oops".to_string()));
    let err = client_for(&server).item_type_names().unwrap_err();
    assert!(matches!(err, SyncError::Http(_)));
}

#[test]
fn add_note_sends_fields_and_allows_duplicates() {
    let server = StubServer::start(|_| ok(json!(1_700_000_000_000_i64)));
    let client = client_for(&server);
    let decision = Decision {
        collection: "ATPL::Nav".to_string(),
        front: "The {{c1::VOR}} is a beacon".to_string(),
        back: "VHF".to_string(),
        reference: "NAV 3".to_string(),
        tags: vec!["radio".to_string()],
        item_type: ItemType::ClozeLike,
        replace_id: None,
    };

    let id = client.add_item(&NewItem::from_decision(&decision)).unwrap();

    assert_eq!(id, 1_700_000_000_000);
    let note = &server.requests()[0].body["params"]["note"];
    assert_eq!(note["deckName"], "ATPL::Nav");
    assert_eq!(note["modelName"], "Cloze");
    assert_eq!(note["fields"]["Text"], "The {{c1::VOR}} is a beacon");
    assert_eq!(note["fields"]["Back Extra"], "VHF");
    assert_eq!(note["fields"]["Ref"], "NAV 3");
    assert_eq!(note["tags"], json!(["radio"]));
    assert_eq!(note["options"]["allowDuplicate"], true);
}

#[test]
fn index_is_built_from_find_and_info() {
    let server = fake_anki(vec![
        ("Basic", json!({ "Front": " Q1 ", "Back": " A1 " })),
        ("Cloze", json!({ "Text": "{{c1::X}}", "Back Extra": "" })),
    ]);
    let client = client_for(&server);

    let index = ExistingIndex::fetch(&client).unwrap();

    assert_eq!(index.len(), 2);
    let plain = index.get(ItemType::Plain, "Q1").unwrap();
    assert_eq!(plain.back, "A1");
    assert!(index.get(ItemType::ClozeLike, "{{c1::X}}").is_some());
}

#[test]
fn missing_note_type_is_reported_by_name() {
    let server = StubServer::start(|_| ok(json!(["Basic"])));
    let err = require_item_types(&client_for(&server)).unwrap_err();
    match err {
        SyncError::MissingItemType { name } => assert_eq!(name, "Cloze"),
        other => panic!("expected missing note type, got {other:?}"),
    }
}
