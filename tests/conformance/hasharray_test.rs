//! Hash-array construction and access.

use std::io::{Seek, SeekFrom};

use openlipc::{HashArray, HashValueType};

use crate::common::{bus, open};

#[tokio::test]
async fn test_hasharray() {
    let bus = bus();
    let lipc = open(&bus, None).await;

    let ha = lipc.new_hasharray();
    ha.free(true);

    let mut ha = lipc.new_hasharray();
    assert_eq!(ha.hash_count(), 0);

    let index = ha.add_hash();
    assert_eq!(ha.hash_count(), 1);
    assert_eq!(index, 0);

    let string = "Value";
    let blob = [1u8, 2, 0, 4, 5];
    ha.put_int(0, "Int", 0xB00B).unwrap();
    ha.put_string(0, "Key", string).unwrap();
    ha.put_blob(0, "Doom", &blob).unwrap();

    let keys = ha.keys(0).unwrap();
    assert_eq!(keys.len(), 3);
    assert_eq!(keys[0], "Int");
    assert_eq!(keys[2], "Doom");

    assert_eq!(ha.check_key(0, "Int").unwrap(), (HashValueType::Int, 4));
    assert_eq!(
        ha.check_key(0, "Key").unwrap(),
        (HashValueType::String, string.len() + 1)
    );
    assert_eq!(ha.check_key(0, "Doom").unwrap(), (HashValueType::Blob, blob.len()));

    assert_eq!(ha.get_int(0, "Int").unwrap(), 0xB00B);
    let stored = ha.get_string(0, "Key").unwrap();
    assert_eq!(stored, string);
    assert_ne!(stored.as_ptr(), string.as_ptr());
    let stored = ha.get_blob(0, "Doom").unwrap();
    assert_eq!(stored, &blob);
    assert_ne!(stored.as_ptr(), blob.as_ptr());

    let mut file = tempfile::tempfile().unwrap();
    ha.save(&mut file).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    let restored = HashArray::restore(Some(&lipc), &mut file).unwrap();
    assert_eq!(restored, ha);
    assert_eq!(restored.owner(), Some(lipc.session()));

    ha.destroy();
    lipc.close().await;
}
