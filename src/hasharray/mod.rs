//! Hash-arrays: ordered sequences of string-keyed maps.
//!
//! Each map keeps its keys in insertion order and holds integer, string or
//! blob values. All keys and values are owned copies. Maps are addressed by
//! their 0-based index, which never changes since maps are only appended.

mod codec;

use std::fmt;

use uuid::Uuid;

use crate::bus::SessionId;
use crate::error::{LipcError, Result};

/// Type of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashValueType {
    Int,
    String,
    Blob,
}

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashValue {
    Int(i32),
    String(String),
    Blob(Vec<u8>),
}

impl HashValue {
    pub fn value_type(&self) -> HashValueType {
        match self {
            Self::Int(_) => HashValueType::Int,
            Self::String(_) => HashValueType::String,
            Self::Blob(_) => HashValueType::Blob,
        }
    }

    /// Stored size in bytes. Strings count their terminator.
    pub fn size(&self) -> usize {
        match self {
            Self::Int(_) => std::mem::size_of::<i32>(),
            Self::String(s) => s.len() + 1,
            Self::Blob(b) => b.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HashMapEntry {
    pub(crate) key: String,
    pub(crate) value: HashValue,
}

/// One map of a hash-array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Map {
    pub(crate) entries: Vec<HashMapEntry>,
}

impl Map {
    fn get(&self, key: &str) -> Option<&HashValue> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    fn put(&mut self, key: &str, value: HashValue) {
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(HashMapEntry {
                key: key.to_string(),
                value,
            }),
        }
    }
}

/// Ordered sequence of string-keyed maps.
///
/// `Clone` copies the content together with the identity and owner tag;
/// [`HashArray::copy_from`] copies the content only. Equality compares
/// content only.
#[derive(Debug, Clone)]
pub struct HashArray {
    id: Uuid,
    owner: Option<SessionId>,
    pub(crate) maps: Vec<Map>,
}

impl HashArray {
    /// Create an empty hash-array.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: None,
            maps: Vec::new(),
        }
    }

    /// Create an empty hash-array tagged with a session.
    pub fn with_owner(owner: SessionId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::new()
        }
    }

    /// Identity, preserved by `clone`.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Session the hash-array was created through.
    pub fn owner(&self) -> Option<SessionId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<SessionId>) {
        self.owner = owner;
    }

    /// Append an empty map and return its index.
    pub fn add_hash(&mut self) -> usize {
        self.maps.push(Map::default());
        self.maps.len() - 1
    }

    pub fn hash_count(&self) -> usize {
        self.maps.len()
    }

    pub fn put_int(&mut self, index: usize, key: &str, value: i32) -> Result<()> {
        self.put(index, key, HashValue::Int(value))
    }

    pub fn put_string(&mut self, index: usize, key: &str, value: &str) -> Result<()> {
        self.put(index, key, HashValue::String(value.to_string()))
    }

    pub fn put_blob(&mut self, index: usize, key: &str, value: &[u8]) -> Result<()> {
        self.put(index, key, HashValue::Blob(value.to_vec()))
    }

    /// Insert or overwrite a value. Overwriting may change its type.
    pub fn put(&mut self, index: usize, key: &str, value: HashValue) -> Result<()> {
        if key.is_empty() {
            return Err(LipcError::InvalidArg("empty key".to_string()));
        }
        self.map_mut(index)?.put(key, value);
        Ok(())
    }

    pub fn get_int(&self, index: usize, key: &str) -> Result<i32> {
        match self.value(index, key)? {
            HashValue::Int(value) => Ok(*value),
            _ => Err(LipcError::NoSuchParam),
        }
    }

    pub fn get_string(&self, index: usize, key: &str) -> Result<&str> {
        match self.value(index, key)? {
            HashValue::String(value) => Ok(value),
            _ => Err(LipcError::NoSuchParam),
        }
    }

    pub fn get_blob(&self, index: usize, key: &str) -> Result<&[u8]> {
        match self.value(index, key)? {
            HashValue::Blob(value) => Ok(value),
            _ => Err(LipcError::NoSuchParam),
        }
    }

    /// Look up a value of any type.
    pub fn value(&self, index: usize, key: &str) -> Result<&HashValue> {
        self.map(index)?.get(key).ok_or(LipcError::NoSuchParam)
    }

    /// Type and stored size of a value.
    pub fn check_key(&self, index: usize, key: &str) -> Result<(HashValueType, usize)> {
        let value = self.value(index, key)?;
        Ok((value.value_type(), value.size()))
    }

    /// Keys of a map in insertion order.
    pub fn keys(&self, index: usize) -> Result<Vec<&str>> {
        Ok(self
            .map(index)?
            .entries
            .iter()
            .map(|entry| entry.key.as_str())
            .collect())
    }

    pub fn key_count(&self, index: usize) -> Result<usize> {
        Ok(self.map(index)?.entries.len())
    }

    /// Replace the content with a copy of `src`'s.
    ///
    /// Identity and owner are left untouched.
    pub fn copy_from(&mut self, src: &HashArray) {
        self.maps = src.maps.clone();
    }

    /// Copy one map of `src` into this hash-array.
    ///
    /// `dest_index` may name an existing map, which is overwritten, or equal
    /// [`HashArray::hash_count`] to append.
    pub fn copy_hash(&mut self, dest_index: usize, src: &HashArray, src_index: usize) -> Result<()> {
        let map = src.map(src_index)?.clone();
        match dest_index.cmp(&self.maps.len()) {
            std::cmp::Ordering::Less => self.maps[dest_index] = map,
            std::cmp::Ordering::Equal => self.maps.push(map),
            std::cmp::Ordering::Greater => {
                return Err(LipcError::InvalidArg(format!(
                    "destination index {dest_index} out of range"
                )))
            }
        }
        Ok(())
    }

    /// Release the hash-array.
    ///
    /// `destroy` asks for the backing storage to be released as well, which
    /// for an in-process hash-array is always the case.
    pub fn free(self, destroy: bool) {
        tracing::trace!(id = %self.id, destroy, "Hash-array released");
    }

    pub fn destroy(self) {
        self.free(true);
    }

    fn map(&self, index: usize) -> Result<&Map> {
        self.maps
            .get(index)
            .ok_or_else(|| LipcError::InvalidArg(format!("no hash at index {index}")))
    }

    fn map_mut(&mut self, index: usize) -> Result<&mut Map> {
        self.maps
            .get_mut(index)
            .ok_or_else(|| LipcError::InvalidArg(format!("no hash at index {index}")))
    }
}

impl Default for HashArray {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for HashArray {
    fn eq(&self, other: &Self) -> bool {
        self.maps == other.maps
    }
}

impl Eq for HashArray {}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "int({value})"),
            Self::String(value) => write!(f, "str({value:?})"),
            Self::Blob(value) => write!(f, "blob({})", hex::encode(value)),
        }
    }
}

impl fmt::Display for HashArray {
    /// Renders as `[{"Key": str("Value"), "Int": int(1)}, {}]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, map) in self.maps.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str("{")?;
            for (j, entry) in map.entries.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{:?}: {}", entry.key, entry.value)?;
            }
            f.write_str("}")?;
        }
        f.write_str("]")
    }
}
