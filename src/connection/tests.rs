use super::*;
use crate::bus::{LocalBus, MockBus};
use crate::config::TimeoutConfig;
use crate::error::StatusCode;

fn local_bus() -> Arc<dyn Bus> {
    Arc::new(LocalBus::new())
}

#[test]
fn test_validate_service_name_accepts_dotted_names() {
    assert!(validate_service_name("com.example", 255).is_ok());
    assert!(validate_service_name("com.lab126.power_d", 255).is_ok());
    assert!(validate_service_name("org.my-app.v2", 255).is_ok());
}

#[test]
fn test_validate_service_name_rejects_malformed() {
    for name in ["", "example", "com..example", ".com.example", "com.example.", "com.1abc", "com.ex ample"] {
        let err = validate_service_name(name, 255).unwrap_err();
        assert_eq!(err.status(), StatusCode::InvalidArg, "{name}");
    }
}

#[test]
fn test_validate_service_name_length_limit() {
    let name = format!("com.{}", "a".repeat(20));
    let err = validate_service_name(&name, 10).unwrap_err();
    assert_eq!(err, LipcError::ServiceNameTooLong { len: 24, limit: 10 });
}

#[tokio::test]
async fn test_open_no_name_is_anonymous() {
    let lipc = Connection::open_no_name(local_bus()).await.unwrap();
    assert_eq!(lipc.service_name(), None);
    assert_eq!(lipc.service_name(), None);
    lipc.close().await;
}

#[tokio::test]
async fn test_open_binds_name() {
    let bus = Arc::new(LocalBus::new());
    let lipc = Connection::open(bus.clone(), "com.example").await.unwrap();

    assert_eq!(lipc.service_name(), Some("com.example"));
    assert_eq!(bus.name_owner("com.example").await, Some(lipc.session()));

    lipc.close().await;
    assert_eq!(bus.name_owner("com.example").await, None);
    assert_eq!(bus.session_count().await, 0);
}

#[tokio::test]
async fn test_open_duplicate_name() {
    let bus = local_bus();
    let first = Connection::open(bus.clone(), "com.example").await.unwrap();

    let err = Connection::open(bus.clone(), "com.example").await.unwrap_err();
    assert_eq!(err, LipcError::DuplicateServiceName("com.example".to_string()));

    first.close().await;
    let again = Connection::open(bus, "com.example").await.unwrap();
    again.close().await;
}

#[tokio::test]
async fn test_dropped_connection_releases_name() {
    let bus = Arc::new(LocalBus::new());
    let dyn_bus: Arc<dyn Bus> = bus.clone();

    let lipc = Connection::open(dyn_bus.clone(), "com.example").await.unwrap();
    drop(lipc);

    // Release runs on a spawned task
    for _ in 0..10 {
        if bus.session_count().await == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(bus.session_count().await, 0);
    assert_eq!(bus.name_owner("com.example").await, None);

    let again = Connection::open(dyn_bus, "com.example").await.unwrap();
    again.close().await;
}

#[tokio::test]
async fn test_open_name_too_long() {
    let mut config = LipcConfig::for_test();
    config.limits.max_service_name_len = 8;

    let err = Connection::open_with_config(local_bus(), Some("com.example"), &config)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::ServiceNameTooLong);
}

#[tokio::test]
async fn test_open_unreachable_bus() {
    let bus = Arc::new(MockBus::new());
    bus.set_fail_on_connect(true).await;

    let err = Connection::open_no_name(bus).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::InitTransportFailed);
}

#[tokio::test]
async fn test_timeout_from_config() {
    let config = LipcConfig {
        timeout: TimeoutConfig::with_millis(250),
        ..Default::default()
    };
    let lipc = Connection::open_with_config(local_bus(), None, &config)
        .await
        .unwrap();

    assert_eq!(lipc.prop_access_timeout(), Duration::from_millis(250));
    lipc.close().await;
}

#[tokio::test]
async fn test_new_hasharray_is_tagged() {
    let lipc = Connection::open_no_name(local_bus()).await.unwrap();
    let ha = lipc.new_hasharray();

    assert_eq!(ha.owner(), Some(lipc.session()));
    assert_eq!(ha.hash_count(), 0);
    lipc.close().await;
}
