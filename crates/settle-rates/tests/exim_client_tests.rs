//! HTTP-level tests for the Korea Eximbank client against a mock server.

use chrono::NaiveDate;
use serde_json::json;
use settle_rates::{KoreaEximClient, RateClientConfig, RateError, RateSource};
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const ENDPOINT: &str = "/site/program/financial/exchangeJSON";

fn business_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

fn client_for(server: &MockServer) -> KoreaEximClient {
    let config = RateClientConfig {
        api_base_url: server.uri(),
        timeout_secs: 2,
        ..Default::default()
    };
    KoreaEximClient::with_api_key(config, "test-key").unwrap()
}

#[tokio::test]
async fn test_fetch_rate_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("authkey", "test-key"))
        .and(query_param("searchdate", "20240102"))
        .and(query_param("data", "AP01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"result": 1, "cur_unit": "EUR", "cur_nm": "유로", "deal_bas_r": "1,425.11"},
            {"result": 1, "cur_unit": "USD", "cur_nm": "미국 달러", "deal_bas_r": "1,300.4"}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let quote = client_for(&mock_server)
        .fetch_rate(business_day())
        .await
        .unwrap();

    assert_eq!(quote.currency, "USD");
    assert!((quote.rate - 1300.4).abs() < 1e-9);
    assert_eq!(quote.rate_date, business_day());
    assert_eq!(quote.source, "koreaexim");
}

#[tokio::test]
async fn test_empty_list_means_no_rate_for_date() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
    let err = client_for(&mock_server)
        .fetch_rate(saturday)
        .await
        .unwrap_err();

    assert!(err.is_no_rate());
    assert_eq!(err.to_string(), "no exchange rate is published for 2024-01-06");
}

#[tokio::test]
async fn test_missing_currency_means_no_rate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"result": 1, "cur_unit": "EUR", "deal_bas_r": "1,425.11"}
        ])))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch_rate(business_day())
        .await
        .unwrap_err();
    assert!(err.is_no_rate());
}

#[tokio::test]
async fn test_bad_auth_key_result_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"result": 3, "cur_unit": null, "deal_bas_r": null}
        ])))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch_rate(business_day())
        .await
        .unwrap_err();
    assert!(matches!(err, RateError::Api { code: 3, .. }));
}

#[tokio::test]
async fn test_http_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch_rate(business_day())
        .await
        .unwrap_err();

    match err {
        RateError::Http { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch_rate(business_day())
        .await
        .unwrap_err();
    assert!(matches!(err, RateError::Parse(_)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let config = RateClientConfig {
        api_base_url: mock_server.uri(),
        timeout_secs: 1,
        ..Default::default()
    };
    let client = KoreaEximClient::with_api_key(config, "test-key").unwrap();

    let err = client.fetch_rate(business_day()).await.unwrap_err();
    assert!(matches!(err, RateError::Timeout(1)));
    assert!(err.is_network_error());
}

#[tokio::test]
async fn test_unreachable_host() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    drop(mock_server);

    let config = RateClientConfig {
        api_base_url: uri,
        timeout_secs: 2,
        ..Default::default()
    };
    let client = KoreaEximClient::with_api_key(config, "test-key").unwrap();

    let err = client.fetch_rate(business_day()).await.unwrap_err();
    assert!(err.is_network_error(), "got {:?}", err);
}

#[test]
fn test_missing_api_key_env() {
    let config = RateClientConfig {
        api_key_env: "SETTLE_TEST_UNSET_EXIM_KEY".to_string(),
        ..Default::default()
    };
    // SAFETY: test-only variable name not read by other tests
    unsafe {
        std::env::remove_var("SETTLE_TEST_UNSET_EXIM_KEY");
    }

    let err = KoreaEximClient::from_config(config).err().unwrap();
    assert!(matches!(err, RateError::MissingApiKey(ref var) if var == "SETTLE_TEST_UNSET_EXIM_KEY"));
}
