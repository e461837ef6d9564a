//! Binary form of a hash-array.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! "LIHA" u32:map_count
//!   per map:  u32:key_count
//!     per key: u32:key_len key u8:tag u32:value_len value
//! ```
//!
//! Tags are 0 for int (4 bytes), 1 for string (UTF-8 plus a NUL) and 2 for
//! blob.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use super::{HashArray, HashMapEntry, HashValue, Map};
use crate::connection::Connection;
use crate::error::{LipcError, Result};

const MAGIC: &[u8; 4] = b"LIHA";

const TAG_INT: u8 = 0;
const TAG_STRING: u8 = 1;
const TAG_BLOB: u8 = 2;

impl HashArray {
    /// Encode to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_slice(MAGIC);
        buf.put_u32(self.maps.len() as u32);

        for map in &self.maps {
            buf.put_u32(map.entries.len() as u32);
            for entry in &map.entries {
                buf.put_u32(entry.key.len() as u32);
                buf.put_slice(entry.key.as_bytes());
                match &entry.value {
                    HashValue::Int(value) => {
                        buf.put_u8(TAG_INT);
                        buf.put_u32(4);
                        buf.put_i32(*value);
                    }
                    HashValue::String(value) => {
                        buf.put_u8(TAG_STRING);
                        buf.put_u32(value.len() as u32 + 1);
                        buf.put_slice(value.as_bytes());
                        buf.put_u8(0);
                    }
                    HashValue::Blob(value) => {
                        buf.put_u8(TAG_BLOB);
                        buf.put_u32(value.len() as u32);
                        buf.put_slice(value);
                    }
                }
            }
        }

        buf.to_vec()
    }

    /// Decode bytes produced by [`HashArray::to_bytes`].
    ///
    /// The result gets a fresh identity and no owner.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        let ha = decode(&mut buf)?;

        if buf.has_remaining() {
            return Err(malformed("trailing bytes"));
        }
        Ok(ha)
    }

    /// Write the binary form to `writer`.
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        writer
            .write_all(&self.to_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| LipcError::Internal(format!("failed to save hash-array: {e}")))
    }

    /// Read one hash-array written by [`HashArray::save`].
    ///
    /// Consumes exactly the bytes of that hash-array; whatever follows in the
    /// stream is left unread. With a connection, the result is tagged with
    /// its session.
    pub fn restore<R: Read>(connection: Option<&Connection>, mut reader: R) -> Result<Self> {
        let mut ha = decode(&mut reader)?;
        ha.set_owner(connection.map(Connection::session));
        Ok(ha)
    }
}

fn decode<R: Read>(reader: &mut R) -> Result<HashArray> {
    if read_exact::<_, 4>(reader)? != *MAGIC {
        return Err(malformed("bad magic"));
    }

    let map_count = read_u32(reader)?;
    let mut ha = HashArray::new();
    for _ in 0..map_count {
        let key_count = read_u32(reader)?;
        let mut map = Map::default();
        for _ in 0..key_count {
            let key_len = read_u32(reader)?;
            let key = String::from_utf8(read_vec(reader, key_len)?)
                .map_err(|_| malformed("key is not UTF-8"))?;
            if key.is_empty() || map.get(&key).is_some() {
                return Err(malformed("empty or duplicate key"));
            }

            let [tag] = read_exact::<_, 1>(reader)?;
            let len = read_u32(reader)?;
            let raw = read_vec(reader, len)?;
            let value = decode_value(tag, &raw)?;

            map.entries.push(HashMapEntry { key, value });
        }
        ha.maps.push(map);
    }

    Ok(ha)
}

fn decode_value(tag: u8, raw: &[u8]) -> Result<HashValue> {
    match tag {
        TAG_INT => {
            let bytes: [u8; 4] = raw
                .try_into()
                .map_err(|_| malformed("int value is not 4 bytes"))?;
            Ok(HashValue::Int(i32::from_be_bytes(bytes)))
        }
        TAG_STRING => {
            let text = match raw.split_last() {
                Some((&0, text)) => text,
                _ => return Err(malformed("string value is not terminated")),
            };
            let text = std::str::from_utf8(text).map_err(|_| malformed("string is not UTF-8"))?;
            Ok(HashValue::String(text.to_string()))
        }
        TAG_BLOB => Ok(HashValue::Blob(raw.to_vec())),
        other => Err(malformed(&format!("unknown value tag {other}"))),
    }
}

fn read_exact<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    reader.read_exact(&mut bytes).map_err(read_error)?;
    Ok(bytes)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    read_exact::<_, 4>(reader).map(u32::from_be_bytes)
}

/// Read a length-prefixed field without trusting the length for allocation.
fn read_vec<R: Read>(reader: &mut R, len: u32) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .by_ref()
        .take(u64::from(len))
        .read_to_end(&mut bytes)
        .map_err(read_error)?;
    if bytes.len() != len as usize {
        return Err(malformed("truncated"));
    }
    Ok(bytes)
}

fn read_error(err: std::io::Error) -> LipcError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof => malformed("truncated"),
        _ => LipcError::Internal(format!("failed to restore hash-array: {err}")),
    }
}

fn malformed(reason: &str) -> LipcError {
    LipcError::InvalidArg(format!("malformed hash-array: {reason}"))
}
