//! Signal fan-out utilities.

use std::sync::Arc;

use tracing::debug;

use super::{BusEndpoint, BusError, Signal};

/// Deliver a signal to each endpoint in order.
///
/// Each endpoint finishes handling before the next one starts, so the
/// publisher observes delivery as complete when this returns.
pub(crate) async fn deliver_signal(endpoints: Vec<Arc<dyn BusEndpoint>>, signal: Arc<Signal>) {
    debug!(
        sender = %signal.sender,
        member = %signal.member,
        receivers = endpoints.len(),
        "Delivering signal"
    );

    for endpoint in endpoints {
        endpoint.handle_signal(Arc::clone(&signal)).await;
    }
}

/// Reject messages over the configured size.
pub(crate) fn check_message_size(size: usize, limit: usize) -> Result<(), BusError> {
    if size > limit {
        return Err(BusError::MessageTooLarge { size, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingEndpoint {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
        calls: AtomicUsize,
    }

    impl BusEndpoint for RecordingEndpoint {
        fn handle_call(&self, payload: Bytes) -> BoxFuture<'static, Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { payload })
        }

        fn handle_signal(&self, _signal: Arc<Signal>) -> BoxFuture<'static, ()> {
            let log = Arc::clone(&self.log);
            let id = self.id;
            Box::pin(async move {
                log.lock().unwrap().push(id);
            })
        }
    }

    #[tokio::test]
    async fn test_deliver_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let endpoints: Vec<Arc<dyn BusEndpoint>> = (0..3)
            .map(|id| {
                Arc::new(RecordingEndpoint {
                    id,
                    log: Arc::clone(&log),
                    calls: AtomicUsize::new(0),
                }) as Arc<dyn BusEndpoint>
            })
            .collect();

        let signal = Arc::new(Signal {
            sender: "com.example".to_string(),
            member: "event".to_string(),
            payload: Bytes::new(),
        });
        deliver_signal(endpoints, signal).await;

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_check_message_size() {
        assert!(check_message_size(10, 10).is_ok());
        assert_eq!(
            check_message_size(11, 10),
            Err(BusError::MessageTooLarge { size: 11, limit: 10 })
        );
    }
}
