//! End-to-end forwarding tests against a stub upstream that captures
//! what it receives.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::any;
use axum::Router;

use llm_relay::registry::Registry;
use llm_relay::server::{self, AppState, RelayOptions, Stats};

#[derive(Clone, Debug)]
struct Received {
    method: String,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
}

#[derive(Clone, Default)]
struct Capture {
    last: Arc<Mutex<Option<Received>>>,
}

impl Capture {
    fn take(&self) -> Received {
        self.last
            .lock()
            .unwrap()
            .take()
            .expect("upstream received no request")
    }
}

async fn capture_handler(State(capture): State<Capture>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, 1 << 20).await.unwrap();
    *capture.last.lock().unwrap() = Some(Received {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers: parts.headers,
        body,
    });
    (StatusCode::OK, [("x-upstream", "stub")], "upstream-ok").into_response()
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

async fn start_capture_upstream() -> (SocketAddr, Capture) {
    let capture = Capture::default();
    let router = Router::new()
        .fallback(capture_handler)
        .with_state(capture.clone());
    (serve(router).await, capture)
}

async fn start_relay(registry: Registry, scrub: bool) -> SocketAddr {
    let state = Arc::new(AppState {
        registry,
        http_client: server::build_http_client(),
        options: RelayOptions::new(scrub),
        start_time: Instant::now(),
        stats: Stats::new(),
    });
    serve(server::build_router(state, 1 << 20)).await
}

fn single_service(name: &str, base_url: String) -> Registry {
    Registry::new(vec![(name.to_string(), base_url)])
}

/// Client that never follows redirects itself, so redirect handling is
/// attributable to the relay.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn forwards_method_path_and_query() {
    let (upstream, capture) = start_capture_upstream().await;
    let relay = start_relay(single_service("openai", format!("http://{upstream}")), true).await;

    let resp = client()
        .get(format!("http://{relay}/openai/chat/completions?limit=5&x=%20y"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("x-upstream").unwrap(), "stub");
    assert_eq!(resp.text().await.unwrap(), "upstream-ok");

    let received = capture.take();
    assert_eq!(received.method, "GET");
    assert_eq!(received.uri, "/chat/completions?limit=5&x=%20y");
}

#[tokio::test]
async fn base_url_path_prefix_is_concatenated_literally() {
    let (upstream, capture) = start_capture_upstream().await;
    // Base URL already ends in /v1, caller path repeats it — the
    // duplicate segment is preserved, not deduplicated.
    let relay = start_relay(
        single_service("openai", format!("http://{upstream}/v1")),
        true,
    )
    .await;

    let resp = client()
        .get(format!("http://{relay}/openai/v1/models?limit=5"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(capture.take().uri, "/v1/v1/models?limit=5");
}

#[tokio::test]
async fn service_identifier_is_case_insensitive() {
    let (upstream, capture) = start_capture_upstream().await;
    let relay = start_relay(single_service("openai", format!("http://{upstream}")), true).await;

    for variant in ["openai", "OPENAI", "OpenAI"] {
        let resp = client()
            .get(format!("http://{relay}/{variant}/v1/models"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "variant {variant}");
        assert_eq!(capture.take().uri, "/v1/models");
    }
}

#[tokio::test]
async fn short_paths_get_exact_400() {
    let relay = start_relay(Registry::from_env(), true).await;

    for path in ["/", "/openai", "/openai/"] {
        let resp = client()
            .get(format!("http://{relay}{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "path {path}");
        assert_eq!(
            resp.text().await.unwrap(),
            "Invalid URL format. Expected /{service}/{path}"
        );
    }
}

#[tokio::test]
async fn unknown_service_gets_exact_400() {
    let relay = start_relay(Registry::from_env(), true).await;

    let resp = client()
        .get(format!("http://{relay}/notaprovider/v1/models"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "Service not supported");
}

#[tokio::test]
async fn post_body_round_trips_byte_exact() {
    let (upstream, capture) = start_capture_upstream().await;
    let relay = start_relay(single_service("openai", format!("http://{upstream}")), true).await;

    let payload: Vec<u8> = vec![0x00, 0x01, 0xff, b'{', b'}'];
    let resp = client()
        .post(format!("http://{relay}/openai/v1/chat"))
        .header("content-type", "application/octet-stream")
        .body(payload.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let received = capture.take();
    assert_eq!(received.method, "POST");
    assert_eq!(received.body.as_ref(), payload.as_slice());
    assert_eq!(
        received.headers.get("content-type").unwrap(),
        "application/octet-stream"
    );
}

#[tokio::test]
async fn get_and_head_never_carry_a_body_upstream() {
    let (upstream, capture) = start_capture_upstream().await;
    let relay = start_relay(single_service("openai", format!("http://{upstream}")), true).await;

    let resp = client()
        .get(format!("http://{relay}/openai/v1/models"))
        .body("should-vanish")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(capture.take().body.is_empty());

    let resp = client()
        .request(
            reqwest::Method::HEAD,
            format!("http://{relay}/openai/v1/models"),
        )
        .body("should-vanish")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let received = capture.take();
    assert_eq!(received.method, "HEAD");
    assert!(received.body.is_empty());
}

#[tokio::test]
async fn scrubbing_removes_denylisted_headers_only() {
    let (upstream, capture) = start_capture_upstream().await;
    let relay = start_relay(single_service("openai", format!("http://{upstream}")), true).await;

    let resp = client()
        .get(format!("http://{relay}/openai/v1/models"))
        .header("X-Forwarded-For", "198.51.100.7")
        .header("CF-Connecting-IP", "198.51.100.7")
        .header("x-real-ip", "198.51.100.7")
        .header("cf-visitor", "{\"scheme\":\"https\"}")
        .header("CF-IPCountry", "DE")
        .header("cf-ray", "8a1b2c3d4e5f-FRA")
        .header("authorization", "Bearer sk-test")
        .header("x-api-key", "key-123")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let received = capture.take();
    for name in [
        "x-forwarded-for",
        "cf-connecting-ip",
        "x-real-ip",
        "cf-visitor",
        "cf-ipcountry",
        "cf-ray",
    ] {
        assert!(
            received.headers.get(name).is_none(),
            "{name} leaked upstream"
        );
    }
    assert_eq!(received.headers.get("authorization").unwrap(), "Bearer sk-test");
    assert_eq!(received.headers.get("x-api-key").unwrap(), "key-123");
}

#[tokio::test]
async fn scrubbing_disabled_forwards_client_headers() {
    let (upstream, capture) = start_capture_upstream().await;
    let relay = start_relay(
        single_service("openai", format!("http://{upstream}")),
        false,
    )
    .await;

    let resp = client()
        .get(format!("http://{relay}/openai/v1/models"))
        .header("x-forwarded-for", "198.51.100.7")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        capture.take().headers.get("x-forwarded-for").unwrap(),
        "198.51.100.7"
    );
}

#[tokio::test]
async fn upstream_transport_failure_yields_500() {
    // Bind then drop a listener to get a port with nothing behind it.
    let closed_port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let relay = start_relay(
        single_service("openai", format!("http://127.0.0.1:{closed_port}")),
        true,
    )
    .await;

    let resp = client()
        .get(format!("http://{relay}/openai/v1/models"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body = resp.text().await.unwrap();
    assert!(
        body.starts_with("Internal Error: "),
        "unexpected body: {body}"
    );
}

#[tokio::test]
async fn upstream_status_and_headers_pass_through() {
    let router = Router::new().route(
        "/teapot",
        any(|| async {
            (
                StatusCode::IM_A_TEAPOT,
                [("x-upstream-custom", "value")],
                "short and stout",
            )
        }),
    );
    let upstream = serve(router).await;
    let relay = start_relay(single_service("openai", format!("http://{upstream}")), true).await;

    let resp = client()
        .get(format!("http://{relay}/openai/teapot"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 418);
    assert_eq!(resp.headers().get("x-upstream-custom").unwrap(), "value");
    assert_eq!(resp.text().await.unwrap(), "short and stout");
}

#[tokio::test]
async fn relay_follows_redirects_itself() {
    let router = Router::new()
        .route("/old", any(|| async { Redirect::temporary("/new") }))
        .route("/see-other", any(|| async { Redirect::to("/new") }))
        .route(
            "/new",
            any(|method: Method| async move { method.to_string() }),
        );
    let upstream = serve(router).await;
    let relay = start_relay(single_service("openai", format!("http://{upstream}")), true).await;

    // 307 replays the original method
    let resp = client()
        .post(format!("http://{relay}/openai/old"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "POST");

    // 303 demotes to GET
    let resp = client()
        .post(format!("http://{relay}/openai/see-other"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "GET");
}

#[cfg(feature = "stream-inspect")]
mod stream_inspect {
    use super::*;

    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use axum::http::header;
    use hyper::body::Frame;

    /// Upstream body that yields one frame per chunk, so `data:` lines
    /// cross frame boundaries on their way through the inspector.
    struct ChunkedBody {
        chunks: VecDeque<Bytes>,
    }

    impl hyper::body::Body for ChunkedBody {
        type Data = Bytes;
        type Error = std::convert::Infallible;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
            Poll::Ready(self.chunks.pop_front().map(|chunk| Ok(Frame::data(chunk))))
        }
    }

    async fn start_tracing_relay(registry: Registry) -> SocketAddr {
        let mut options = RelayOptions::new(true);
        options.trace_stream = true;
        let state = Arc::new(AppState {
            registry,
            http_client: server::build_http_client(),
            options,
            start_time: Instant::now(),
            stats: Stats::new(),
        });
        serve(server::build_router(state, 1 << 20)).await
    }

    // Chunks split a JSON payload mid-key and include a line that is not
    // JSON at all; the relayed bytes must still be identical.
    const CHUNKS: &[&str] = &[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"delta\":{\"te",
        "xt\":\"lo\"}}\n\ndata: not json at all\n\n",
        "data: [DONE]\n\n",
    ];

    #[tokio::test]
    async fn inspected_stream_relays_byte_identical() {
        let router = Router::new().route(
            "/stream",
            any(|| async {
                let chunks: VecDeque<Bytes> = CHUNKS
                    .iter()
                    .map(|chunk| Bytes::from_static(chunk.as_bytes()))
                    .collect();
                Response::builder()
                    .header(header::CONTENT_TYPE, "text/event-stream")
                    .body(axum::body::Body::new(ChunkedBody { chunks }))
                    .unwrap()
            }),
        );
        let upstream = serve(router).await;
        let relay =
            start_tracing_relay(single_service("openai", format!("http://{upstream}"))).await;

        let resp = client()
            .get(format!("http://{relay}/openai/stream"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/event-stream"
        );
        let body = resp.bytes().await.unwrap();
        assert_eq!(body.as_ref(), CHUNKS.concat().as_bytes());
    }

    #[tokio::test]
    async fn non_event_stream_bodies_relay_unchanged_with_tracing_on() {
        let (upstream, capture) = start_capture_upstream().await;
        let relay =
            start_tracing_relay(single_service("openai", format!("http://{upstream}"))).await;

        let resp = client()
            .get(format!("http://{relay}/openai/v1/models"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "upstream-ok");
        capture.take();
    }
}
