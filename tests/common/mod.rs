//! Fake media server for integration tests.
//!
//! Serves `POST /jsonrpc` on an ephemeral localhost port and answers the
//! handful of methods the client uses, recording every request body and its
//! headers so tests can inspect what went over the wire.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// How the fake server behaves.
#[derive(Clone, Copy, Debug)]
pub enum Mode {
    /// Answer like a media server with a two-movie library.
    Library,
    /// Every request fails with HTTP 500.
    Broken,
    /// Every request gets a 200 with a non-JSON body.
    Garbage,
}

/// A request as the server saw it.
#[derive(Clone, Debug)]
pub struct Seen {
    pub body: Value,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct Shared {
    mode: Mode,
    seen: Arc<Mutex<Vec<Seen>>>,
}

pub struct FakeServer {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeServer {
    pub async fn start(mode: Mode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = Shared {
            mode,
            seen: seen.clone(),
        };
        let app = Router::new()
            .route("/jsonrpc", post(jsonrpc))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, seen }
    }

    pub fn url(&self) -> String {
        format!("http://{}/jsonrpc", self.addr)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

/// An address nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/jsonrpc")
}

async fn jsonrpc(State(state): State<Shared>, headers: HeaderMap, body: String) -> Response {
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    state.seen.lock().unwrap().push(Seen {
        body: parsed.clone(),
        content_type: header("content-type"),
        authorization: header("authorization"),
    });

    match state.mode {
        Mode::Broken => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
        Mode::Garbage => (StatusCode::OK, "<html>definitely not json</html>").into_response(),
        Mode::Library => Json(answer(&parsed)).into_response(),
    }
}

fn answer(request: &Value) -> Value {
    let id = request["id"].clone();
    let params = &request["params"];
    let result = match request["method"].as_str().unwrap_or("") {
        "VideoLibrary.GetMovies" => json!({
            "limits": {"start": 0, "end": 2, "total": 2},
            "movies": [
                {"movieid": 1, "label": "A", "year": 2000},
                {"movieid": 2, "label": "B", "year": 2001}
            ]
        }),
        "VideoLibrary.GetMovieDetails" => match params["movieid"].as_i64() {
            Some(movieid @ (1 | 2)) => json!({
                "moviedetails": {
                    "movieid": movieid,
                    "label": if movieid == 1 { "A" } else { "B" },
                    "year": 1999 + movieid,
                    "file": format!("/media/movies/{movieid}.mkv"),
                    "trailer": "",
                    "imdbnumber": "tt0000001",
                    "dateadded": "2021-06-01 20:00:00",
                    "streamdetails": {"video": [{"width": 1280, "height": 720}]}
                }
            }),
            _ => {
                return json!({
                    "id": id,
                    "jsonrpc": "2.0",
                    "error": {"code": -32602, "message": "Invalid params."}
                })
            }
        },
        "Player.Open" | "Player.Stop" | "VideoLibrary.Scan" | "VideoLibrary.Clean" => json!("OK"),
        "JSONRPC.Ping" => json!("pong"),
        _ => {
            return json!({
                "id": id,
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found."}
            })
        }
    };
    json!({"id": id, "jsonrpc": "2.0", "result": result})
}
