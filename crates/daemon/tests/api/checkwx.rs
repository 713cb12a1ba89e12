use crate::helpers::{envelope, kbjc_metar, kfnl_metar, test_config, test_logger, CHECKWX_KEY};
use metar_daemon::{CheckWxClient, FetchError, ObservationSource};
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn airports(list: &[&str]) -> Vec<String> {
    list.iter().map(|a| a.to_string()).collect()
}

#[tokio::test]
async fn batched_request_returns_each_airport() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metar/KBJC,KFNL/decoded"))
        .and(header("X-API-Key", CHECKWX_KEY))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(vec![kfnl_metar(), kbjc_metar()])),
        )
        .expect(1)
        .mount(&checkwx)
        .await;

    let config = test_config(&checkwx, &influx, "KBJC,KFNL");
    let client = CheckWxClient::new(test_logger(), &config).unwrap();
    let results = client.fetch(&config.airports).await;

    assert_eq!(results.len(), 2);
    let kbjc = results["KBJC"].as_ref().unwrap();
    assert_eq!(kbjc.elevation.as_ref().unwrap().feet, Some(5673.0));
    assert_eq!(kbjc.visibility.as_ref().unwrap().meters, Some(16093.0));
    let kfnl = results["KFNL"].as_ref().unwrap();
    assert_eq!(kfnl.wind.as_ref().unwrap().gust_kts, Some(17.0));
}

#[tokio::test]
async fn airport_missing_from_batch_is_absent() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metar/KBJC,KFNL/decoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(vec![kbjc_metar()])))
        .mount(&checkwx)
        .await;

    let config = test_config(&checkwx, &influx, "KBJC,KFNL");
    let client = CheckWxClient::new(test_logger(), &config).unwrap();
    let results = client.fetch(&config.airports).await;

    assert!(results["KBJC"].is_ok());
    assert_eq!(results["KFNL"], Err(FetchError::MissingAirport));
}

#[tokio::test]
async fn empty_payload_per_airport_is_absent() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metar/KBJC/decoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(vec![kbjc_metar()])))
        .expect(1)
        .mount(&checkwx)
        .await;
    Mock::given(method("GET"))
        .and(path("/metar/KFNL/decoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(vec![])))
        .expect(1)
        .mount(&checkwx)
        .await;

    let mut config = test_config(&checkwx, &influx, "KBJC,KFNL");
    config.per_airport_requests = true;
    let client = CheckWxClient::new(test_logger(), &config).unwrap();
    let results = client.fetch(&config.airports).await;

    assert!(results["KBJC"].is_ok());
    assert_eq!(results["KFNL"], Err(FetchError::EmptyPayload));
}

#[tokio::test]
async fn error_status_marks_every_airport_absent() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&checkwx)
        .await;

    let config = test_config(&checkwx, &influx, "KBJC,KFNL");
    let client = CheckWxClient::new(test_logger(), &config).unwrap();
    let results = client.fetch(&config.airports).await;

    for airport in ["KBJC", "KFNL"] {
        assert_eq!(
            results[airport],
            Err(FetchError::Status {
                status: 401,
                body: "Unauthorized".to_string()
            })
        );
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&checkwx)
        .await;

    let config = test_config(&checkwx, &influx, "KBJC");
    let client = CheckWxClient::new(test_logger(), &config).unwrap();
    let results = client.fetch(&airports(&["KBJC"])).await;

    assert!(matches!(results["KBJC"], Err(FetchError::Decode(_))));
}

#[tokio::test]
async fn unreachable_source_is_a_request_error() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    let mut config = test_config(&checkwx, &influx, "KBJC");
    config.checkwx_base_url = "http://127.0.0.1:1".to_string();

    let client = CheckWxClient::new(test_logger(), &config).unwrap();
    let results = client.fetch(&config.airports).await;

    assert!(matches!(results["KBJC"], Err(FetchError::Request(_))));
}
