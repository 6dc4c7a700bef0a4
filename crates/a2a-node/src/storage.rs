//! In-memory reference implementation of `a2a_types::interfaces::Storage`.

use async_trait::async_trait;
use dashmap::DashMap;

use a2a_types::error::A2aError;
use a2a_types::interfaces::Storage;

#[derive(Default)]
pub struct InMemoryStorage {
    map: DashMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), A2aError> {
        self.map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, A2aError> {
        Ok(self.map.get(key).map(|v| v.clone()))
    }

    async fn delete(&self, key: &[u8]) -> Result<(), A2aError> {
        self.map.remove(key);
        Ok(())
    }

    async fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, A2aError> {
        Ok(self
            .map
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    async fn put_if(&self, key: &[u8], expected: Option<&[u8]>, new_value: &[u8]) -> Result<bool, A2aError> {
        match self.map.entry(key.to_vec()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if expected == Some(occupied.get().as_slice()) {
                    occupied.insert(new_value.to_vec());
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                if expected.is_none() {
                    vacant.insert(new_value.to_vec());
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let storage = InMemoryStorage::new();
        storage.put(b"k1", b"v1").await.unwrap();
        assert_eq!(storage.get(b"k1").await.unwrap(), Some(b"v1".to_vec()));
        storage.delete(b"k1").await.unwrap();
        assert_eq!(storage.get(b"k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_if_enforces_compare_and_swap() {
        let storage = InMemoryStorage::new();
        assert!(storage.put_if(b"k1", None, b"v1").await.unwrap());
        assert!(!storage.put_if(b"k1", None, b"v2").await.unwrap());
        assert!(storage.put_if(b"k1", Some(b"v1"), b"v2").await.unwrap());
        assert_eq!(storage.get(b"k1").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn prefix_scan_returns_matching_keys_only() {
        let storage = InMemoryStorage::new();
        storage.put(b"agent/1", b"a").await.unwrap();
        storage.put(b"agent/2", b"b").await.unwrap();
        storage.put(b"task/1", b"c").await.unwrap();
        let mut results = storage.prefix_scan(b"agent/").await.unwrap();
        results.sort();
        assert_eq!(results.len(), 2);
    }
}
