//! Frankfurter client tests against a wiremock server.

use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::json;
use std::str::FromStr;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use factura_server::adapters::{FrankfurterClient, RateLookup, RateLookupError};

const TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_dated_lookup_returns_rate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2024-01-05"))
        .and(query_param("from", "EUR"))
        .and(query_param("to", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "amount": 1.0,
            "base": "EUR",
            "date": "2024-01-05",
            "rates": { "USD": 1.0923 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = FrankfurterClient::new(server.uri());
    let rate = client
        .lookup(
            NaiveDate::from_ymd_opt(2024, 1, 5),
            "EUR",
            "USD",
            TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(rate, BigDecimal::from_str("1.0923").unwrap());
}

#[tokio::test]
async fn test_missing_date_falls_back_to_latest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .and(query_param("from", "GBP"))
        .and(query_param("to", "EUR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rates": { "EUR": 1.17 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = FrankfurterClient::new(server.uri());
    let rate = client.lookup(None, "GBP", "EUR", TIMEOUT).await.unwrap();

    assert_eq!(rate, BigDecimal::from_str("1.17").unwrap());
}

#[tokio::test]
async fn test_currency_codes_are_uppercased() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .and(query_param("from", "EUR"))
        .and(query_param("to", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rates": { "USD": 1.1 }
        })))
        .mount(&server)
        .await;

    let client = FrankfurterClient::new(server.uri());
    let rate = client.lookup(None, "eur", "usd", TIMEOUT).await.unwrap();

    assert_eq!(rate, BigDecimal::from_str("1.1").unwrap());
}

#[tokio::test]
async fn test_server_error_is_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = FrankfurterClient::new(server.uri());
    let err = client.lookup(None, "EUR", "USD", TIMEOUT).await.unwrap_err();

    assert!(matches!(err, RateLookupError::Http(_)));
}

#[tokio::test]
async fn test_missing_currency_in_response_is_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rates": { "CHF": 0.93 }
        })))
        .mount(&server)
        .await;

    let client = FrankfurterClient::new(server.uri());
    let err = client.lookup(None, "EUR", "USD", TIMEOUT).await.unwrap_err();

    assert!(matches!(err, RateLookupError::Parse(_)));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "rates": { "USD": 1.1 } }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = FrankfurterClient::new(server.uri());
    let err = client
        .lookup(None, "EUR", "USD", Duration::from_millis(100))
        .await
        .unwrap_err();

    assert!(matches!(err, RateLookupError::Timeout(_)));
}

#[tokio::test]
async fn test_stalled_body_times_out() {
    use tokio::io::AsyncWriteExt;

    // Serves prompt headers, then never delivers the promised body.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 64\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let client = FrankfurterClient::new(format!("http://{addr}"));
    let err = client
        .lookup(None, "EUR", "USD", Duration::from_millis(100))
        .await
        .unwrap_err();

    assert!(matches!(err, RateLookupError::Timeout(_)));
}
