use std::{collections::HashMap, time::Duration};

use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
use bitcoin::{
    hashes::{Hash, sha256},
    secp256k1::{Secp256k1, SecretKey},
};
use lightning_invoice::{Currency, InvoiceBuilder, PaymentSecret};
use lsat_core::{
    lightning::LightningBackend,
    types::{InvoiceRequest, PaymentHash},
};
use lsat_kit::{
    DEFAULT_REQUEST_TIMEOUT,
    lnurl::{LnurlClient, LnurlClientError},
};
use serde_json::{Value, json};
use url::Url;

/// Serves a pay request whose callback answers with `callback_body`.
async fn spawn_service(tag: &'static str, callback_body: Value) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let pay_request = json!({
        "tag": tag,
        "callback": format!("http://{addr}/callback"),
        "minSendable": 1_000,
        "maxSendable": 100_000_000,
        "metadata": "[[\"text/plain\",\"lsat\"]]",
        "commentAllowed": 32
    });

    let router = Router::new()
        .route(
            "/.well-known/lnurlp/alice",
            get(move || {
                let body = pay_request.clone();
                async move { Json(body) }
            }),
        )
        .route(
            "/callback",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let body = callback_body.clone();
                async move {
                    if !params.contains_key("amount") {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "status": "ERROR", "reason": "missing amount" })),
                        );
                    }
                    (StatusCode::OK, Json(body))
                }
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({}))
            }),
        );

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/.well-known/lnurlp/alice")).unwrap()
}

fn client(url: Url) -> LnurlClient {
    LnurlClient::from_pay_url(url, DEFAULT_REQUEST_TIMEOUT).unwrap()
}

fn request(amount_sats: u64) -> InvoiceRequest {
    InvoiceRequest::builder().amount_sats(amount_sats).build()
}

/// A regtest BOLT11 invoice signed by a throwaway node key.
fn signed_invoice(payment_hash: [u8; 32], amount_msat: u64) -> String {
    let node_key = SecretKey::from_slice(&[42; 32]).unwrap();
    InvoiceBuilder::new(Currency::Regtest)
        .description("lsat".to_string())
        .payment_hash(sha256::Hash::from_byte_array(payment_hash))
        .payment_secret(PaymentSecret([7; 32]))
        .amount_milli_satoshis(amount_msat)
        .current_timestamp()
        .min_final_cltv_expiry_delta(144)
        .build_signed(|hash| Secp256k1::new().sign_ecdsa_recoverable(hash, &node_key))
        .unwrap()
        .to_string()
}

fn hash_bytes() -> [u8; 32] {
    std::array::from_fn(|i| i as u8)
}

#[tokio::test]
async fn test_pay_request() {
    let url = spawn_service("payRequest", json!({ "pr": "lnbc1" })).await;
    let client = client(url);

    let pay_request = client.pay_request().await.unwrap();
    assert_eq!(pay_request.min_sendable, 1_000);
    assert_eq!(pay_request.max_sendable, 100_000_000);
    assert_eq!(pay_request.comment_allowed, 32);
    assert_eq!(pay_request.callback.path(), "/callback");
}

#[tokio::test]
async fn test_wrong_tag() {
    let url = spawn_service("withdrawRequest", json!({ "pr": "lnbc1" })).await;
    let client = client(url);

    let err = client.issue_invoice(request(10)).await.unwrap_err();
    assert!(matches!(err, LnurlClientError::UnexpectedTag(tag) if tag == "withdrawRequest"));
}

#[tokio::test]
async fn test_amount_out_of_range() {
    let url = spawn_service("payRequest", json!({ "pr": "lnbc1" })).await;
    let client = client(url);

    let err = client.issue_invoice(request(0)).await.unwrap_err();
    assert!(matches!(
        err,
        LnurlClientError::AmountOutOfRange {
            amount_msat: 0,
            min_msat: 1_000,
            ..
        }
    ));

    let err = client.issue_invoice(request(200_000)).await.unwrap_err();
    assert!(matches!(err, LnurlClientError::AmountOutOfRange { .. }));
}

#[tokio::test]
async fn test_service_error() {
    let url = spawn_service(
        "payRequest",
        json!({ "status": "ERROR", "reason": "wallet offline" }),
    )
    .await;
    let client = client(url);

    let err = client.issue_invoice(request(10)).await.unwrap_err();
    assert!(matches!(err, LnurlClientError::Service(reason) if reason == "wallet offline"));
}

#[tokio::test]
async fn test_invalid_invoice() {
    let url = spawn_service("payRequest", json!({ "pr": "definitely not bolt11" })).await;
    let client = client(url);

    let err = client.issue_invoice(request(10)).await.unwrap_err();
    assert!(matches!(err, LnurlClientError::InvalidInvoice(_)));
}

#[tokio::test]
async fn test_missing_endpoint() {
    let url = spawn_service("payRequest", json!({ "pr": "lnbc1" })).await;
    let client = client(url.join("/.well-known/lnurlp/bob").unwrap());

    let err = client.pay_request().await.unwrap_err();
    assert!(matches!(err, LnurlClientError::Service(_)));
}

#[tokio::test]
async fn test_issue_invoice() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let pr = signed_invoice(hash_bytes(), 10_000);
    let url = spawn_service("payRequest", json!({ "pr": pr })).await;

    let invoice = client(url).issue_invoice(request(10)).await.unwrap();
    assert_eq!(invoice.payment_hash, PaymentHash(hash_bytes()));
    assert_eq!(
        invoice.payment_hash.to_string(),
        "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
    );
    assert_eq!(invoice.payment_request, pr);
    assert_eq!(invoice.amount_sats, 10);
}

#[tokio::test]
async fn test_invoice_amount_mismatch() {
    let pr = signed_invoice(hash_bytes(), 20_000);
    let url = spawn_service("payRequest", json!({ "pr": pr })).await;

    let err = client(url).issue_invoice(request(10)).await.unwrap_err();
    assert!(matches!(
        err,
        LnurlClientError::AmountMismatch {
            expected: 10_000,
            actual: 20_000
        }
    ));
}

#[tokio::test]
async fn test_request_timeout() {
    let url = spawn_service("payRequest", json!({ "pr": "lnbc1" })).await;
    let client =
        LnurlClient::from_pay_url(url.join("/slow").unwrap(), Duration::from_millis(100)).unwrap();

    let err = client.pay_request().await.unwrap_err();
    assert!(matches!(err, LnurlClientError::HttpRequestError(err) if err.is_timeout()));
}
