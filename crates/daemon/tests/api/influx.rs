use crate::helpers::{test_config, test_logger, INFLUX_TOKEN};
use metar_daemon::{encode, Ack, InfluxWriter, ParsedObservation, PointWriter, WriteError};
use time::macros::datetime;
use wiremock::{
    matchers::{body_string, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn observation() -> ParsedObservation {
    ParsedObservation {
        airport: "KBJC".to_string(),
        temperature: Some(25.0),
        altimeter: Some(1013.25),
        elevation: Some(5673.0),
        density_altitude: Some(8234.5),
        ..Default::default()
    }
}

#[tokio::test]
async fn no_content_is_an_ack() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .and(query_param("org", "home"))
        .and(query_param("bucket", "weather"))
        .and(query_param("precision", "s"))
        .and(header("Authorization", format!("Token {}", INFLUX_TOKEN).as_str()))
        .and(header("Content-Type", "text/plain; charset=utf-8"))
        .and(body_string(
            "metar,airport=KBJC temperature=25,altimeter=1013.25,elevation=5673,density_altitude=8234.5 1723485600",
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&influx)
        .await;

    let config = test_config(&checkwx, &influx, "KBJC");
    let writer = InfluxWriter::new(test_logger(), &config).unwrap();
    let point = encode(&observation(), datetime!(2024-08-12 18:00:00 UTC));

    let ack = writer.write(&point).await.unwrap();
    assert_eq!(
        ack,
        Ack {
            airport: "KBJC".to_string()
        }
    );
}

#[tokio::test]
async fn bad_request_carries_status_and_body() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    let body = r#"{"code":"invalid","message":"unable to parse 'metar,airport=KBJC  1723485600': missing fields"}"#;
    Mock::given(method("POST"))
        .and(path("/api/v2/write"))
        .respond_with(ResponseTemplate::new(400).set_body_string(body))
        .expect(1)
        .mount(&influx)
        .await;

    let config = test_config(&checkwx, &influx, "KBJC");
    let writer = InfluxWriter::new(test_logger(), &config).unwrap();
    let point = encode(&observation(), datetime!(2024-08-12 18:00:00 UTC));

    let err = writer.write(&point).await.unwrap_err();
    assert_eq!(
        err,
        WriteError::Rejected {
            status: 400,
            body: body.to_string()
        }
    );
}

#[tokio::test]
async fn success_other_than_no_content_is_rejected() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&influx)
        .await;

    let config = test_config(&checkwx, &influx, "KBJC");
    let writer = InfluxWriter::new(test_logger(), &config).unwrap();
    let point = encode(&observation(), datetime!(2024-08-12 18:00:00 UTC));

    assert!(matches!(
        writer.write(&point).await,
        Err(WriteError::Rejected { status: 200, .. })
    ));
}

#[tokio::test]
async fn unreachable_database_is_a_request_error() {
    let checkwx = MockServer::start().await;
    let influx = MockServer::start().await;
    let mut config = test_config(&checkwx, &influx, "KBJC");
    config.influxdb_host = "127.0.0.1".to_string();
    config.influxdb_port = 1;

    let writer = InfluxWriter::new(test_logger(), &config).unwrap();
    assert_eq!(writer.write_url(), "http://127.0.0.1:1/api/v2/write");
    let point = encode(&observation(), datetime!(2024-08-12 18:00:00 UTC));

    assert!(matches!(
        writer.write(&point).await,
        Err(WriteError::Request(_))
    ));
}
