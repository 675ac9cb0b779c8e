//! Local axum server standing in for AnkiConnect.
//!
//! The server runs on its own tokio runtime so tests can call it through
//! the blocking client from a plain test thread.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;

/// Request as seen by a stub handler. `body` is `Null` for GETs.
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub method: String,
    pub body: Value,
}

type Handler = dyn Fn(&StubRequest) -> (u16, String) + Send + Sync;

#[derive(Clone)]
struct StubState {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
    // Owns the server task; dropping it stops the server.
    _runtime: Runtime,
}

impl StubServer {
    /// Serve `handler` on a random local port for as long as the server lives.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&StubRequest) -> (u16, String) + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("stub runtime");
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .expect("bind stub server");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            handler: Arc::new(handler),
            requests: Arc::clone(&requests),
        };
        let router = Router::new()
            .route("/", get(answer).post(answer))
            .with_state(state);
        runtime.spawn(async move { axum::serve(listener, router).await });

        Self {
            url,
            requests,
            _runtime: runtime,
        }
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Actions of every POSTed request, in order.
    pub fn actions(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.body.get("action").and_then(Value::as_str).map(str::to_string))
            .collect()
    }
}

async fn answer(State(state): State<StubState>, method: Method, body: Bytes) -> Response {
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    let request = StubRequest {
        method: method.to_string(),
        body,
    };

    let (status, payload) = (state.handler)(&request);
    state.requests.lock().expect("requests lock").push(request);

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], payload).into_response()
}

/// A JSON-RPC reply carrying `result`.
pub fn ok(result: Value) -> (u16, String) {
    (200, json!({ "result": result, "error": null }).to_string())
}

/// A JSON-RPC reply carrying an error message.
pub fn rpc_error(message: &str) -> (u16, String) {
    (200, json!({ "result": null, "error": message }).to_string())
}

#[derive(Debug, Default)]
struct AnkiState {
    next_id: i64,
    notes: BTreeMap<i64, (String, String, Value)>,
}

/// Stub that behaves like a small Anki collection with Basic and Cloze
/// note types. `seed` holds `(model, fields)` pairs present from the start.
pub fn fake_anki(seed: Vec<(&str, Value)>) -> StubServer {
    let mut state = AnkiState {
        next_id: 1,
        ..AnkiState::default()
    };
    for (model, fields) in seed {
        let id = state.next_id;
        state.next_id += 1;
        state
            .notes
            .insert(id, (model.to_string(), "Default".to_string(), fields));
    }
    let state = Mutex::new(state);

    StubServer::start(move |request| {
        if request.method == "GET" {
            return (200, "\"AnkiConnect v.6\"".to_string());
        }
        let mut state = state.lock().expect("anki state lock");
        let params = &request.body["params"];
        match request.body["action"].as_str().unwrap_or_default() {
            "createDeck" => ok(json!(1)),
            "modelNames" => ok(json!(["Basic", "Cloze", "Basic (and reversed card)"])),
            "findNotes" => {
                let field = params["query"]
                    .as_str()
                    .unwrap_or_default()
                    .trim_end_matches(":*")
                    .to_string();
                let ids: Vec<i64> = state
                    .notes
                    .iter()
                    .filter(|(_, (_, _, fields))| fields.get(&field).is_some())
                    .map(|(id, _)| *id)
                    .collect();
                ok(json!(ids))
            }
            "notesInfo" => {
                let infos: Vec<Value> = params["notes"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(Value::as_i64)
                    .filter_map(|id| state.notes.get(&id).map(|note| (id, note)))
                    .map(|(id, (model, _, fields))| {
                        let fields: serde_json::Map<String, Value> = fields
                            .as_object()
                            .cloned()
                            .unwrap_or_default()
                            .into_iter()
                            .enumerate()
                            .map(|(order, (name, value))| {
                                (name, json!({ "value": value, "order": order }))
                            })
                            .collect();
                        json!({ "noteId": id, "modelName": model, "fields": fields, "tags": [] })
                    })
                    .collect();
                ok(json!(infos))
            }
            "addNote" => {
                let note = &params["note"];
                let id = state.next_id;
                state.next_id += 1;
                state.notes.insert(
                    id,
                    (
                        note["modelName"].as_str().unwrap_or_default().to_string(),
                        note["deckName"].as_str().unwrap_or_default().to_string(),
                        note["fields"].clone(),
                    ),
                );
                ok(json!(id))
            }
            "deleteNotes" => {
                for id in params["notes"].as_array().cloned().unwrap_or_default() {
                    if let Some(id) = id.as_i64() {
                        state.notes.remove(&id);
                    }
                }
                ok(Value::Null)
            }
            other => rpc_error(&format!("unsupported action {other}")),
        }
    })
}
