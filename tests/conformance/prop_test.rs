//! Serving and accessing properties.

use std::sync::{Arc, Mutex};

use openlipc::{
    int_getter, int_setter, string_getter, string_setter, LipcError, PropError, StatusCode,
    UserData,
};

use crate::common::{bus, open, SERVICE};

struct Backing {
    int: i32,
    string: String,
    string_calls: usize,
}

#[tokio::test]
async fn test_property_lifecycle() {
    let bus = bus();
    let lipc = open(&bus, Some(SERVICE)).await;

    let backing = Arc::new(Mutex::new(Backing {
        int: 0xDEAD,
        string: "Yes! Yes! Yes!".to_string(),
        string_calls: 0,
    }));

    let state = backing.clone();
    let get_int = int_getter(move |call| {
        assert_eq!(call.data_as::<i32>(), Some(&0x1111));
        Ok(state.lock().unwrap().int)
    });
    let state = backing.clone();
    let set_int = int_setter(move |_, value| {
        state.lock().unwrap().int = value;
        Ok(())
    });
    let state = backing.clone();
    let get_str = string_getter(move |call| {
        let mut state = state.lock().unwrap();
        if call.capacity() < 500 {
            state.string_calls += 1;
            assert_eq!(state.string_calls, 1);
            return Err(PropError::BufferTooSmall { needed: 500 });
        }
        Ok(state.string.clone())
    });
    let state = backing.clone();
    let set_str = string_setter(move |call, value| {
        assert_eq!(call.data_as::<i32>(), Some(&0x2222));
        state.lock().unwrap().string = value.to_string();
        Ok(())
    });

    lipc.register_int_property("int", Some(get_int), Some(set_int), Some(Arc::new(0x1111) as UserData))
        .await
        .unwrap();
    lipc.register_string_property("str", Some(get_str), Some(set_str), Some(Arc::new(0x2222) as UserData))
        .await
        .unwrap();

    // Default values
    assert_eq!(lipc.get_int_property(SERVICE, "int").await.unwrap(), 0xDEAD);
    assert_eq!(
        lipc.get_string_property(SERVICE, "str").await.unwrap(),
        "Yes! Yes! Yes!"
    );

    // Updates reach the callbacks
    lipc.set_int_property(SERVICE, "int", 0xBEEF).await.unwrap();
    assert_eq!(backing.lock().unwrap().int, 0xBEEF);
    lipc.set_string_property(SERVICE, "str", "No!").await.unwrap();
    assert_eq!(backing.lock().unwrap().string, "No!");

    assert_eq!(
        lipc.get_properties(SERVICE).await.unwrap(),
        "str Str rw int Int rw "
    );

    let err = lipc.get_int_property(SERVICE, "xxx").await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NoSuchProperty);

    assert!(lipc.unregister_property("int").await.unwrap().is_some());
    let data = lipc.unregister_property("str").await.unwrap().unwrap();
    assert_eq!(data.downcast_ref::<i32>(), Some(&0x2222));

    lipc.close().await;
}

#[tokio::test]
async fn test_access_modes() {
    let bus = bus();
    let lipc = open(&bus, Some(SERVICE)).await;

    lipc.register_int_property("int", Some(int_getter(|_| Ok(0xDEAD))), None, None)
        .await
        .unwrap();
    lipc.register_string_property("str", None, Some(string_setter(|_, _| Ok(()))), None)
        .await
        .unwrap();

    assert_eq!(
        lipc.get_properties(SERVICE).await.unwrap(),
        "str Str w int Int r "
    );

    let err = lipc.set_int_property(SERVICE, "int", 0x0C0C).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::AccessNotAllowed);

    let mut value = "untouched".to_string();
    match lipc.get_string_property(SERVICE, "str").await {
        Ok(v) => value = v,
        Err(e) => assert!(matches!(e, LipcError::AccessNotAllowed(_))),
    }
    assert_eq!(value, "untouched");

    lipc.unregister_property("int").await.unwrap();
    lipc.unregister_property("str").await.unwrap();
    lipc.close().await;
}

#[tokio::test]
async fn test_remote_client() {
    let bus = bus();
    let server = open(&bus, Some(SERVICE)).await;
    let client = open(&bus, None).await;

    server
        .register_int_property("int", Some(int_getter(|_| Ok(42))), None, None)
        .await
        .unwrap();

    assert_eq!(client.get_int_property(SERVICE, "int").await.unwrap(), 42);

    server.close().await;
    let err = client.get_int_property(SERVICE, "int").await.unwrap_err();
    assert_eq!(err.status(), StatusCode::NoSuchSource);

    client.close().await;
}
