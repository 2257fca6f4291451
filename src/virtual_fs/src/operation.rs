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

//! Per operation bookkeeping shared by every primitive store call of one
//! composite operation: cancellation, call timeout and the count of keys
//! already changed, which decides between a clean and a partial failure.

use std::{
    future::Future,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    config::FsConfig,
    store::{ListOptions, ObjectStoreAdapterRef},
    Error, Result, Stage, StoreError, StoreErrorKind, StoreResult,
};

/// Every key and sub-prefix directly under one prefix, across all pages.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    pub keys: Vec<String>,
    pub common_prefixes: Vec<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.common_prefixes.is_empty()
    }
}

pub struct Operation {
    store: ObjectStoreAdapterRef,
    timeout: Duration,
    page_size: usize,
    concurrency: usize,
    cancel: CancellationToken,
    mutated: AtomicUsize,
}

impl Operation {
    pub fn new(store: ObjectStoreAdapterRef, config: &FsConfig, cancel: CancellationToken) -> Self {
        Self {
            store,
            timeout: config.op_timeout(),
            page_size: config.page_size(),
            concurrency: config.concurrency(),
            cancel,
            mutated: AtomicUsize::new(0),
        }
    }

    /// A follow-up phase sharing store, limits and cancellation, but with its
    /// own change count.
    pub fn fork(&self) -> Self {
        Self {
            store: self.store.clone(),
            timeout: self.timeout,
            page_size: self.page_size,
            concurrency: self.concurrency,
            cancel: self.cancel.clone(),
            mutated: AtomicUsize::new(0),
        }
    }

    /// Keys written or deleted so far.
    pub fn mutated(&self) -> usize {
        self.mutated.load(Ordering::Relaxed)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn public_url(&self, key: &str) -> String {
        self.store.public_url(key)
    }

    fn ensure_not_cancelled(&self, stage: Stage) -> Result<()> {
        if self.cancel.is_cancelled() {
            let mutated = self.mutated();
            debug!(%stage, mutated, "Operation cancelled");
            return Err(Error::Cancelled { stage, mutated });
        }

        Ok(())
    }

    async fn timed<T, F>(&self, stage: Stage, key: &str, fut: F) -> Result<StoreResult<T>>
    where
        F: Future<Output = StoreResult<T>>,
    {
        self.ensure_not_cancelled(stage)?;
        let res = match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::new(
                StoreErrorKind::TransientNetwork,
                key,
                format!("store call timed out after {:?}", self.timeout),
            )),
        };

        Ok(res)
    }

    fn failure(&self, stage: Stage, source: StoreError, maybe_applied: bool) -> Error {
        let mutated = self.mutated();
        if mutated > 0 || maybe_applied {
            warn!(%stage, mutated, err = %source, "Operation partially applied");
            Error::PartialFailure {
                stage,
                mutated,
                source,
            }
        } else {
            Error::Store { stage, source }
        }
    }

    /// Pages through one level under `prefix`.
    pub async fn list_all(&self, prefix: &str) -> Result<Listing> {
        let mut listing = Listing::default();
        let mut options = ListOptions::first_page(self.page_size);
        loop {
            let page = self
                .timed(Stage::List, prefix, self.store.list(prefix, options))
                .await?
                .map_err(|e| self.failure(Stage::List, e, false))?;
            listing.keys.extend(page.keys);
            listing.common_prefixes.extend(page.common_prefixes);
            match page.next_offset {
                Some(offset) if offset > options.offset => options.offset = offset,
                _ => break,
            }
        }
        debug!(
            prefix,
            keys = listing.keys.len(),
            prefixes = listing.common_prefixes.len(),
            "List prefix"
        );

        Ok(listing)
    }

    pub async fn upload(&self, stage: Stage, key: &str, bytes: Bytes) -> Result<()> {
        self.timed(stage, key, self.store.upload(key, bytes))
            .await?
            .map_err(|e| self.failure(stage, e, false))?;
        self.mutated.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    pub async fn download(&self, stage: Stage, key: &str) -> Result<Bytes> {
        self.timed(stage, key, self.store.download(key))
            .await?
            .map_err(|e| self.failure(stage, e, false))
    }

    /// Like `download`, but an absent key yields `None`.
    pub async fn download_if_exists(&self, stage: Stage, key: &str) -> Result<Option<Bytes>> {
        match self.timed(stage, key, self.store.download(key)).await? {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(self.failure(stage, e, false)),
        }
    }

    pub async fn exists(&self, stage: Stage, key: &str) -> Result<bool> {
        self.timed(stage, key, self.store.exists(key))
            .await?
            .map_err(|e| self.failure(stage, e, false))
    }

    /// Deletes `keys` in one store call. A failed batch of several keys may
    /// have been applied in part, so it always counts as partial.
    pub async fn delete(&self, stage: Stage, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let first = keys.first().map(String::as_str).unwrap_or_default();
        self.timed(stage, first, self.store.delete(keys))
            .await?
            .map_err(|e| self.failure(stage, e, keys.len() > 1))?;
        self.mutated.fetch_add(keys.len(), Ordering::Relaxed);

        Ok(())
    }
}
