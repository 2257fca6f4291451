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

//! The narrow contract the core uses to reach the flat object store.

mod cloud;

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
pub use cloud::CloudObjectStore;

use crate::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Max entries (keys plus prefixes) returned in one page.
    pub limit: usize,
    /// Number of entries to skip, taken from `ListPage::next_offset`.
    pub offset: usize,
}

impl ListOptions {
    pub fn first_page(limit: usize) -> Self {
        Self { limit, offset: 0 }
    }
}

/// One page of a single level listing. Keys and prefixes are full store
/// paths without trailing separators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub common_prefixes: Vec<String>,
    /// `Some` when more entries follow this page.
    pub next_offset: Option<usize>,
}

#[async_trait]
pub trait ObjectStoreAdapter: Send + Sync + Debug {
    /// Lists one level under `prefix`, entries ordered by name.
    async fn list(&self, prefix: &str, options: ListOptions) -> StoreResult<ListPage>;

    /// Writes `bytes` to `key`, overwriting silently.
    async fn upload(&self, key: &str, bytes: Bytes) -> StoreResult<()>;

    /// Fails with `NotFound` if `key` is absent.
    async fn download(&self, key: &str) -> StoreResult<Bytes>;

    /// Checks the object metadata only, an absent key is `Ok(false)`.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Deletes every key in order. On failure keys deleted before the failing
    /// one stay deleted.
    async fn delete(&self, keys: &[String]) -> StoreResult<()>;

    /// Pure derivation, no network call.
    fn public_url(&self, key: &str) -> String;
}

pub type ObjectStoreAdapterRef = Arc<dyn ObjectStoreAdapter>;
