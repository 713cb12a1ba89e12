use crate::helpers::{envelope, kbjc_metar, test_config, test_logger};
use metar_daemon::{CheckWxClient, CycleReport, InfluxWriter, Poller, SystemClock};
use std::sync::Arc;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn cycle_writes_airports_with_data_and_skips_the_rest() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    // KFNL has no current observation
    Mock::given(method("GET"))
        .and(path("/metar/KBJC,KFNL/decoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(vec![kbjc_metar()])))
        .expect(1)
        .mount(&checkwx)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .and(body_string_contains("metar,airport=KBJC "))
        .and(body_string_contains("visibility=16093"))
        .and(body_string_contains("density_altitude=8234.5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&influx)
        .await;

    let config = Arc::new(test_config(&checkwx, &influx, "KBJC,KFNL"));
    let poller = Poller::new(
        test_logger(),
        config.clone(),
        Arc::new(CheckWxClient::new(test_logger(), &config).unwrap()),
        Arc::new(InfluxWriter::new(test_logger(), &config).unwrap()),
        Arc::new(SystemClock),
    );

    let report = poller.run_cycle().await;
    assert_eq!(
        report,
        CycleReport {
            written: 1,
            skipped: 1,
            failed: 0
        }
    );
}

#[tokio::test]
async fn rejected_write_is_counted_and_cycle_completes() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(vec![kbjc_metar()])))
        .mount(&checkwx)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bucket not found"))
        .expect(1)
        .mount(&influx)
        .await;

    let config = Arc::new(test_config(&checkwx, &influx, "KBJC"));
    let poller = Poller::new(
        test_logger(),
        config.clone(),
        Arc::new(CheckWxClient::new(test_logger(), &config).unwrap()),
        Arc::new(InfluxWriter::new(test_logger(), &config).unwrap()),
        Arc::new(SystemClock),
    );

    let report = poller.run_cycle().await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.written, 0);
}
