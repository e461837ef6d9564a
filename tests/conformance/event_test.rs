//! Sending and receiving events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use openlipc::{event_callback, EventParam, UserData};

use crate::common::{bus, open, SERVICE};

#[tokio::test]
async fn test_event_round_trip() {
    let bus = bus();
    let lipc = open(&bus, Some(SERVICE)).await;
    let count = Arc::new(AtomicUsize::new(0));

    let seen = count.clone();
    let callback = event_callback(move |context, event| {
        assert_eq!(context.service_name(), Some(SERVICE));
        assert_eq!(context.name(), "event");
        assert_eq!(event.source(), SERVICE);
        assert_eq!(event.name(), "event");
        assert_eq!(context.data_as::<i32>(), Some(&0xABCD));

        if seen.load(Ordering::SeqCst) == 0 {
            assert_eq!(event.get_int_param().unwrap(), 0xDEAD);
            assert_eq!(event.get_string_param().unwrap(), "OK");
            assert_eq!(event.get_int_param().unwrap(), 0xE220);

            event.rewind_params();
            assert_eq!(event.get_int_param().unwrap(), 0xDEAD);
        }

        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    lipc.subscribe_ext(SERVICE, Some("event"), callback, Some(Arc::new(0xABCD) as UserData))
        .await
        .unwrap();

    lipc.create_and_send_event(
        "event",
        [EventParam::from(0xDEAD), "OK".into(), 0xE220.into()],
    )
    .await
    .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    lipc.close().await;
}

#[tokio::test]
async fn test_event_between_services() {
    let bus = bus();
    let sender = open(&bus, Some("com.sender")).await;
    let receiver = open(&bus, Some("com.receiver")).await;
    let count = Arc::new(AtomicUsize::new(0));

    let seen = count.clone();
    receiver
        .set_event_callback(event_callback(move |_, event| {
            assert_eq!(event.source(), "com.sender");
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .await;
    receiver.subscribe("com.sender").await.unwrap();

    let mut event = sender.new_event("changed").unwrap();
    event.add_int_param(1);
    event.add_string_param("two");
    sender.send_event(&event).await.unwrap();
    sender.send_event(&event).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    receiver.unsubscribe_ext("com.sender", None).await.unwrap();
    sender.send_event(&event).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    receiver.close().await;
    sender.close().await;
}
