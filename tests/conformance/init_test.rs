//! Opening and closing connections.

use openlipc::{error_string, Connection, LipcError, StatusCode};

use crate::common::{bus, open, SERVICE};

#[tokio::test]
async fn test_open_no_name() {
    let bus = bus();
    let lipc = Connection::open_no_name(bus).await.unwrap();

    assert_eq!(lipc.service_name(), None);
    assert_eq!(lipc.service_name(), None);
    lipc.close().await;
}

#[tokio::test]
async fn test_open_with_name() {
    let bus = bus();

    let lipc = Connection::open(bus.clone(), SERVICE).await.unwrap();
    assert_eq!(lipc.service_name(), Some(SERVICE));
    lipc.close().await;

    // The name is free again once closed
    let lipc = open(&bus, Some(SERVICE)).await;
    assert_eq!(lipc.service_name(), Some(SERVICE));
    lipc.close().await;
}

#[tokio::test]
async fn test_duplicate_name() {
    let bus = bus();
    let first = open(&bus, Some(SERVICE)).await;

    let err = Connection::open(bus.clone(), SERVICE).await.unwrap_err();
    assert!(matches!(err, LipcError::DuplicateServiceName(_)));

    first.close().await;
}

#[test]
fn test_error_strings() {
    assert_eq!(error_string(StatusCode::Ok.code()), "lipcErrNone");
    assert_eq!(error_string(StatusCode::TimedOut.code()), "lipcErrTimedOut");
    assert_eq!(error_string(1000), "lipcErrUnknown");
}
