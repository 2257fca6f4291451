// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{path::Path, ObjectStore, PutPayload};
use tracing::{debug, trace};

use super::{ListOptions, ListPage, ObjectStoreAdapter};
use crate::{StoreError, StoreErrorKind, StoreResult};

pub type ObjectStoreRef = std::sync::Arc<dyn ObjectStore>;

/// Adapter backed by any [`ObjectStore`] implementation (local file system,
/// in memory, S3 and friends).
pub struct CloudObjectStore {
    store: ObjectStoreRef,
    public_base_url: String,
}

impl fmt::Debug for CloudObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudObjectStore")
            .field("store", &self.store.to_string())
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl CloudObjectStore {
    pub fn new(store: ObjectStoreRef, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            store,
            public_base_url,
        }
    }

    fn location(key: &str) -> StoreResult<Path> {
        Path::parse(key).map_err(|e| {
            StoreError::new(StoreErrorKind::Other, key, format!("invalid store key, err:{e}"))
        })
    }
}

#[async_trait]
impl ObjectStoreAdapter for CloudObjectStore {
    async fn list(&self, prefix: &str, options: ListOptions) -> StoreResult<ListPage> {
        let location = if prefix.is_empty() {
            None
        } else {
            Some(Self::location(prefix)?)
        };
        let result = self
            .store
            .list_with_delimiter(location.as_ref())
            .await
            .map_err(|e| StoreError::from((prefix.to_string(), e)))?;

        // Merge keys and prefixes into one name ordered sequence so pages are
        // stable across calls.
        let mut entries = result
            .objects
            .into_iter()
            .map(|meta| (meta.location.to_string(), false))
            .chain(
                result
                    .common_prefixes
                    .into_iter()
                    .map(|p| (p.to_string(), true)),
            )
            .collect::<Vec<_>>();
        entries.sort();

        let total = entries.len();
        let start = options.offset.min(total);
        let end = start.saturating_add(options.limit.max(1)).min(total);
        let mut page = ListPage {
            next_offset: (end < total).then_some(end),
            ..Default::default()
        };
        for (name, is_prefix) in entries.drain(start..end) {
            if is_prefix {
                page.common_prefixes.push(name);
            } else {
                page.keys.push(name);
            }
        }
        trace!(
            prefix,
            total,
            start,
            end,
            "List page from object store"
        );

        Ok(page)
    }

    async fn upload(&self, key: &str, bytes: Bytes) -> StoreResult<()> {
        let location = Self::location(key)?;
        let size = bytes.len();
        self.store
            .put(&location, PutPayload::from_bytes(bytes))
            .await
            .map_err(|e| StoreError::from((key.to_string(), e)))?;
        debug!(key, size, "Upload object");

        Ok(())
    }

    async fn download(&self, key: &str) -> StoreResult<Bytes> {
        let location = Self::location(key)?;
        let bytes = self
            .store
            .get(&location)
            .await
            .map_err(|e| StoreError::from((key.to_string(), e)))?
            .bytes()
            .await
            .map_err(|e| StoreError::from((key.to_string(), e)))?;
        debug!(key, size = bytes.len(), "Download object");

        Ok(bytes)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let location = Self::location(key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StoreError::from((key.to_string(), e))),
        }
    }

    async fn delete(&self, keys: &[String]) -> StoreResult<()> {
        for key in keys {
            let location = Self::location(key)?;
            self.store
                .delete(&location)
                .await
                .map_err(|e| StoreError::from((key.clone(), e)))?;
            trace!(key, "Delete object");
        }
        debug!(num = keys.len(), "Delete objects");

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use object_store::{local::LocalFileSystem, memory::InMemory};
    use test_log::test;

    use super::*;

    async fn put_all(adapter: &CloudObjectStore, keys: &[&str]) {
        for key in keys {
            adapter.upload(key, Bytes::from_static(b"x")).await.unwrap();
        }
    }

    #[test(tokio::test)]
    async fn test_list_single_level() {
        let adapter = CloudObjectStore::new(Arc::new(InMemory::new()), "http://host/bucket/");
        put_all(&adapter, &["b", "a/.folder", "a/x.txt", "a/b/c.txt"]).await;

        let root = adapter.list("", ListOptions::first_page(100)).await.unwrap();
        assert_eq!(root.keys, vec!["b".to_string()]);
        assert_eq!(root.common_prefixes, vec!["a".to_string()]);
        assert_eq!(root.next_offset, None);

        let a = adapter.list("a", ListOptions::first_page(100)).await.unwrap();
        assert_eq!(a.keys, vec!["a/.folder".to_string(), "a/x.txt".to_string()]);
        assert_eq!(a.common_prefixes, vec!["a/b".to_string()]);
    }

    #[test(tokio::test)]
    async fn test_list_pages() {
        let adapter = CloudObjectStore::new(Arc::new(InMemory::new()), "http://host");
        put_all(&adapter, &["d/1", "d/2", "d/3", "d/sub/4"]).await;

        let first = adapter.list("d", ListOptions::first_page(3)).await.unwrap();
        assert_eq!(first.keys, vec!["d/1", "d/2", "d/3"]);
        assert!(first.common_prefixes.is_empty());
        assert_eq!(first.next_offset, Some(3));

        let second = adapter
            .list("d", ListOptions { limit: 3, offset: 3 })
            .await
            .unwrap();
        assert!(second.keys.is_empty());
        assert_eq!(second.common_prefixes, vec!["d/sub"]);
        assert_eq!(second.next_offset, None);
    }

    #[test(tokio::test)]
    async fn test_download_missing() {
        let adapter = CloudObjectStore::new(Arc::new(InMemory::new()), "http://host");
        let err = adapter.download("nope.txt").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.key, "nope.txt");
    }

    #[test(tokio::test)]
    async fn test_exists() {
        let adapter = CloudObjectStore::new(Arc::new(InMemory::new()), "http://host");
        put_all(&adapter, &["a/x.txt"]).await;

        assert!(adapter.exists("a/x.txt").await.unwrap());
        assert!(!adapter.exists("a/y.txt").await.unwrap());
        assert!(!adapter.exists("a").await.unwrap());
    }

    #[test(tokio::test)]
    async fn test_local_file_system_round_trip() {
        let root_dir = temp_dir::TempDir::new().unwrap();
        let store = Arc::new(LocalFileSystem::new_with_prefix(root_dir.path()).unwrap());
        let adapter = CloudObjectStore::new(store, "http://host");

        adapter
            .upload("docs/readme.md", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        let bytes = adapter.download("docs/readme.md").await.unwrap();
        assert_eq!(bytes.as_ref(), b"hello");

        adapter.delete(&["docs/readme.md".to_string()]).await.unwrap();
        let err = adapter.download("docs/readme.md").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_public_url() {
        let adapter = CloudObjectStore::new(Arc::new(InMemory::new()), "http://host/bucket/");
        assert_eq!(
            adapter.public_url("a/b.txt"),
            "http://host/bucket/a/b.txt"
        );
    }
}
