use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use axum::{
    Extension, Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::get,
};
use http_body_util::BodyExt;
use lsat_core::{
    config::LsatConfig,
    lightning::LightningBackend,
    lsat::Lsat,
    root_key::ServerSecret,
    transport::Challenge,
    types::{Caveat, Invoice, InvoiceRequest, Preimage, RequestContext},
};
use lsat_paywall::{
    errors::ErrorBody,
    paywall::{FixedAmount, LsatState, PayWall},
};
use tower::ServiceExt;

/// Every invoice is payable with the all-zero preimage.
#[derive(Debug, Default)]
struct MockBackend {
    issued: AtomicUsize,
}

#[derive(Debug, thiserror::Error)]
#[error("node offline")]
struct NodeOffline;

impl LightningBackend for MockBackend {
    type Error = NodeOffline;

    async fn issue_invoice(&self, request: InvoiceRequest) -> Result<Invoice, Self::Error> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(Invoice {
            payment_hash: Preimage([0; 32]).payment_hash(),
            payment_request: format!("lnbcrt{}n1mock", request.amount_sats),
            amount_sats: request.amount_sats,
        })
    }
}

struct OfflineBackend;

impl LightningBackend for OfflineBackend {
    type Error = NodeOffline;

    async fn issue_invoice(&self, _request: InvoiceRequest) -> Result<Invoice, Self::Error> {
        Err(NodeOffline)
    }
}

fn config() -> LsatConfig {
    LsatConfig::builder()
        .server_secret(ServerSecret::new("testsecret").unwrap())
        .build()
}

fn paywall<B: LightningBackend>(backend: B) -> PayWall<B> {
    PayWall::builder()
        .lsat(Lsat::builder().config(config()).backend(backend).build())
        .pricing(|ctx: &RequestContext| if ctx.path == "/expensive" { 1000u64 } else { 10 })
        .caveats(|ctx: &RequestContext| vec![Caveat::path(ctx.path.clone())])
        .build()
}

async fn protected(Extension(state): Extension<LsatState>) -> &'static str {
    if state.is_paid() {
        "Protected content"
    } else {
        "Free content"
    }
}

fn app<B: LightningBackend + Send + Sync + 'static>(paywall: PayWall<B>) -> Router {
    Router::new()
        .route("/protected", get(protected))
        .route("/expensive", get(protected))
        .layer(paywall)
}

async fn body_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn lsat_request(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::ACCEPT, "application/vnd.lsat.v1.full+json")
        .body(Body::empty())
        .unwrap()
}

async fn challenge_for(app: &Router, path: &str) -> Challenge {
    let response = app.clone().oneshot(lsat_request(path)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let header = response.headers()[header::WWW_AUTHENTICATE]
        .to_str()
        .unwrap()
        .to_string();
    Challenge::parse(&header).unwrap()
}

fn authorized(path: &str, macaroon: &str, preimage: &Preimage) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(
            header::AUTHORIZATION,
            format!("LSAT {macaroon}:{}", preimage.to_hex()),
        )
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_free_without_support_signal() {
    let backend = Arc::new(MockBackend::default());
    let app = app(paywall(backend.clone()));

    let request = Request::builder()
        .uri("/protected")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "Free content");
    assert_eq!(backend.issued.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_challenge() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let app = app(paywall(MockBackend::default()));

    let response = app.oneshot(lsat_request("/expensive")).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let header = response.headers()[header::WWW_AUTHENTICATE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(header.starts_with("L402 macaroon="));
    assert!(header.ends_with(", invoice=lnbcrt1000n1mock"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.code, 402);
    assert_eq!(body.message, "Payment Required");
}

#[tokio::test]
async fn test_accept_authenticate_signal() {
    let app = app(paywall(MockBackend::default()));

    let request = Request::builder()
        .uri("/protected")
        .header("accept-authenticate", "LSAT")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn test_paid() {
    let app = app(paywall(MockBackend::default()));
    let challenge = challenge_for(&app, "/protected").await;

    let response = app
        .oneshot(authorized(
            "/protected",
            &challenge.macaroon,
            &Preimage([0; 32]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "Protected content");
}

#[tokio::test]
async fn test_wrong_preimage() {
    let app = app(paywall(MockBackend::default()));
    let challenge = challenge_for(&app, "/protected").await;

    let response = app
        .oneshot(authorized(
            "/protected",
            &challenge.macaroon,
            &Preimage([1; 32]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.code, 500);
    assert!(body.message.starts_with("Invalid Preimage"));
}

#[tokio::test]
async fn test_token_for_other_path() {
    let app = app(paywall(MockBackend::default()));
    let challenge = challenge_for(&app, "/protected").await;

    let response = app
        .oneshot(authorized(
            "/expensive",
            &challenge.macaroon,
            &Preimage([0; 32]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert!(body.message.starts_with("Caveats don't match"));
}

#[tokio::test]
async fn test_malformed_authorization() {
    let app = app(paywall(MockBackend::default()));

    let request = Request::builder()
        .uri("/protected")
        .header(header::AUTHORIZATION, "L402 not-a-token")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_other_authorization_schemes_are_free() {
    let app = app(paywall(MockBackend::default()));

    let request = Request::builder()
        .uri("/protected")
        .header(header::AUTHORIZATION, "Bearer abc")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response.into_body()).await, "Free content");
}

#[tokio::test]
async fn test_backend_failure() {
    let app = app(paywall(OfflineBackend));

    let response = app.oneshot(lsat_request("/protected")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.message, "Invoice generation failed: node offline");
}

#[tokio::test]
async fn test_handle_without_framework() {
    let paywall = PayWall::builder()
        .lsat(
            Lsat::builder()
                .config(config())
                .backend(MockBackend::default())
                .build(),
        )
        .pricing(FixedAmount(5))
        .build();

    let request = http::Request::builder()
        .uri("/anything")
        .body(())
        .unwrap();
    let response = paywall
        .handle(request, |req| async move {
            let state = req.extensions().get::<LsatState>().cloned();
            http::Response::new(state)
        })
        .await
        .unwrap();
    assert_eq!(response.into_body(), Some(LsatState::Free));

    let context = RequestContext::from(&lsat_request("/anything"));
    let err = paywall.classify(&context).await.unwrap_err();
    assert_eq!(err.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(err.challenge.unwrap().invoice, "lnbcrt5n1mock");
}
