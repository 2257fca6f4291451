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

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{memory::InMemory, ObjectStore};

use crate::{
    store::{CloudObjectStore, ListOptions, ListPage, ObjectStoreAdapter},
    StoreError, StoreErrorKind, StoreResult,
};

pub const TEST_BASE_URL: &str = "http://files.test";

/// Failure to inject, `nth` counts calls of that kind starting from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    List { nth: usize },
    Upload { nth: usize },
    Download { nth: usize },
    Delete { nth: usize },
    /// Every call of any kind hangs forever.
    Hang,
}

/// Adapter over an in memory store that fails chosen calls.
#[derive(Debug)]
pub struct FaultyStore {
    raw: Arc<InMemory>,
    inner: CloudObjectStore,
    faults: Mutex<Vec<Fault>>,
    lists: AtomicUsize,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
    deletes: AtomicUsize,
}

impl FaultyStore {
    pub fn in_memory() -> Self {
        let raw = Arc::new(InMemory::new());
        Self {
            inner: CloudObjectStore::new(raw.clone(), TEST_BASE_URL),
            raw,
            faults: Mutex::new(Vec::new()),
            lists: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn inject(&self, fault: Fault) {
        self.faults.lock().unwrap().push(fault);
    }

    pub fn clear_faults(&self) {
        self.faults.lock().unwrap().clear();
    }

    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Every key in the store, sorted.
    pub async fn all_keys(&self) -> Vec<String> {
        let mut keys = self
            .raw
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        keys.sort();
        keys
    }

    pub async fn put(&self, key: &str, bytes: &'static [u8]) {
        self.inner
            .upload(key, Bytes::from_static(bytes))
            .await
            .unwrap();
    }

    async fn hang_if_injected(&self) {
        let hangs = self.faults.lock().unwrap().contains(&Fault::Hang);
        if hangs {
            futures::future::pending::<()>().await;
        }
    }

    fn check(&self, counter: &AtomicUsize, key: &str, matches: impl Fn(&Fault, usize) -> bool) -> StoreResult<()> {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if self.faults.lock().unwrap().iter().any(|f| matches(f, n)) {
            return Err(StoreError::new(
                StoreErrorKind::TransientNetwork,
                key,
                format!("injected failure on call {n}"),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl ObjectStoreAdapter for FaultyStore {
    async fn list(&self, prefix: &str, options: ListOptions) -> StoreResult<ListPage> {
        self.hang_if_injected().await;
        self.check(&self.lists, prefix, |f, n| matches!(f, Fault::List { nth } if *nth == n))?;
        self.inner.list(prefix, options).await
    }

    async fn upload(&self, key: &str, bytes: Bytes) -> StoreResult<()> {
        self.hang_if_injected().await;
        self.check(&self.uploads, key, |f, n| matches!(f, Fault::Upload { nth } if *nth == n))?;
        self.inner.upload(key, bytes).await
    }

    async fn download(&self, key: &str) -> StoreResult<Bytes> {
        self.hang_if_injected().await;
        self.check(&self.downloads, key, |f, n| {
            matches!(f, Fault::Download { nth } if *nth == n)
        })?;
        self.inner.download(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.hang_if_injected().await;
        self.inner.exists(key).await
    }

    async fn delete(&self, keys: &[String]) -> StoreResult<()> {
        self.hang_if_injected().await;
        let first = keys.first().map(String::as_str).unwrap_or_default();
        self.check(&self.deletes, first, |f, n| matches!(f, Fault::Delete { nth } if *nth == n))?;
        self.inner.delete(keys).await
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }
}
