//! End-to-end scenarios against a real HTTP backend (`wiremock`), driven through
//! [`Factory`] exactly the way an HTTP layer built on top of this crate would.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use botswarm::{Config, Factory, ReqwestHttpClient};
use botswarm::storage::InMemoryStorage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fresh_factory() -> Factory {
    Factory::with_http_client(Arc::new(InMemoryStorage::new()), Arc::new(ReqwestHttpClient::new()))
}

async fn wait_for<F>(mut predicate: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition did not become true within the timeout");
}

fn tree_xml(url: &str) -> String {
    format!(r#"<Root><Action method="\"GET\"" url="\"{url}/ok\""/></Root>"#)
}

// Scenario 1: batch of 10 against a healthy endpoint.
#[tokio::test]
async fn scenario1_all_bots_succeed_and_report_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"v": 1})))
        .mount(&server)
        .await;

    let factory = fresh_factory();
    factory
        .add_behavior("t1".into(), Bytes::from(tree_xml(&server.uri())))
        .await
        .expect("behavior stored");

    let batch_id = factory.add_batch("t1".into(), 10).await.expect("batch starts");

    wait_for(|| factory.batch_info().is_empty()).await;

    let reports = factory.get_report().await.expect("report listed");
    let report = reports.iter().find(|r| r.id == batch_id).expect("report persisted");
    assert_eq!(report.bot_num, 10);
    assert_eq!(report.req_num, 10);
    assert_eq!(report.err_num, 0);
    let api = format!("{}/ok", server.uri());
    let detail = report.url_map.get(api.as_str()).expect("api recorded");
    assert_eq!(detail.req_num, 10);
    assert_eq!(detail.err_num, 0);
}

// Scenario 2: Sequence of Action -> Assert fails; bots end in SBreak, which is not an error.
#[tokio::test]
async fn scenario2_assert_mismatch_breaks_without_counting_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"v": 1})))
        .mount(&server)
        .await;

    let factory = fresh_factory();
    let xml = format!(
        r#"<Root><Sequence><Action method="\"GET\"" url="\"{}/ok\""/><Assert script="meta.v == 2"/></Sequence></Root>"#,
        server.uri()
    );
    factory.add_behavior("t2".into(), Bytes::from(xml)).await.expect("behavior stored");

    let batch_id = factory.add_batch("t2".into(), 5).await.expect("batch starts");
    wait_for(|| factory.batch_info().is_empty()).await;

    let reports = factory.get_report().await.expect("report listed");
    let report = reports.iter().find(|r| r.id == batch_id).expect("report persisted");
    assert_eq!(report.bot_num, 5);
    assert_eq!(report.req_num, 5);
    assert_eq!(report.err_num, 0, "Assert-induced SBreak must not be counted as an error");
}

// Scenario 3: unreachable endpoint, every bot ends in SError.
#[tokio::test]
async fn scenario3_unreachable_endpoint_every_bot_errors() {
    let server = MockServer::start().await;
    // Intentionally never mounted: every request 404s, which reqwest still treats as
    // a non-transport-level HTTP response. Use a torn-down server URI to force an
    // actual transport failure instead.
    let dead_uri = server.uri();
    server.reset().await;
    drop(server);

    let factory = fresh_factory();
    factory
        .add_behavior("t3".into(), Bytes::from(tree_xml(&dead_uri)))
        .await
        .expect("behavior stored");

    let batch_id = factory.add_batch("t3".into(), 3).await.expect("batch starts");
    wait_for(|| factory.batch_info().is_empty()).await;

    let reports = factory.get_report().await.expect("report listed");
    let report = reports.iter().find(|r| r.id == batch_id).expect("report persisted");
    assert_eq!(report.bot_num, 3);
    assert_eq!(report.err_num, 3);
    let api = format!("{dead_uri}/ok");
    let detail = report.url_map.get(api.as_str()).expect("api recorded even on transport failure");
    assert_eq!(detail.err_num, 3);
}

// Scenario 5: concurrency is bounded by batch_size across waves.
#[tokio::test]
async fn scenario5_wave_concurrency_is_bounded_by_batch_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"v": 1})).set_delay(Duration::from_millis(50)))
        .mount(&server)
        .await;

    let factory = fresh_factory();
    factory
        .add_behavior("t5".into(), Bytes::from(tree_xml(&server.uri())))
        .await
        .expect("behavior stored");
    factory
        .set_config(Config {
            channel_size: 10,
            enqueue_delay_ms: 5,
            ..Config::default()
        })
        .await
        .expect("config set");

    let started = std::time::Instant::now();
    let batch_id = factory.add_batch("t5".into(), 100).await.expect("batch starts");

    // Ten waves of ten bots, each wave gated on the 50ms mock delay: if concurrency
    // were unbounded, 100 bots would all finish in ~1 wave's worth of wall time
    // instead of ~10 sequential waves.
    wait_for(|| factory.batch_info().is_empty()).await;
    assert!(started.elapsed() >= Duration::from_millis(9 * 50));

    let reports = factory.get_report().await.expect("report listed");
    let report = reports.iter().find(|r| r.id == batch_id).expect("report persisted");
    assert_eq!(report.bot_num, 100);
}

// Scenario 6: two batches for the same tree name cannot run concurrently.
#[tokio::test]
async fn scenario6_second_concurrent_batch_for_same_name_is_rejected_then_allowed_after_drain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"v": 1})).set_delay(Duration::from_millis(30)))
        .mount(&server)
        .await;

    let factory = fresh_factory();
    factory
        .add_behavior("t6".into(), Bytes::from(tree_xml(&server.uri())))
        .await
        .expect("behavior stored");

    factory.add_batch("t6".into(), 5).await.expect("first batch starts");
    let err = factory
        .add_batch("t6".into(), 5)
        .await
        .expect_err("second concurrent batch for the same name is rejected");
    assert!(matches!(err, botswarm::factory::Error::BatchInProgress(_)));

    wait_for(|| factory.batch_info().is_empty()).await;

    factory
        .add_batch("t6".into(), 5)
        .await
        .expect("a third batch succeeds once the first has finalized");
}
