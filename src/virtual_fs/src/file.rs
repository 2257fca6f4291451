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

use bytes::Bytes;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{info, warn};

use crate::{ensure, operation::Operation, path::VirtualPath, Error, Result, Stage, StoreError};

/// Writes `bytes` to `path`, replacing any existing object.
pub async fn upload(op: &Operation, path: &VirtualPath, bytes: Bytes) -> Result<()> {
    ensure!(!path.is_root(), "file path must not be empty");
    let size = bytes.len();
    op.upload(Stage::Upload, &path.to_key(), bytes).await?;
    info!(path = %path, size, "Upload file");

    Ok(())
}

/// Uploads every `(path, bytes)` pair, at most `op.concurrency()` at a time.
/// Sibling uploads are independent, so their order doesn't matter. Stops at
/// the first failure, files already uploaded stay.
pub async fn upload_many(op: &Operation, files: Vec<(VirtualPath, Bytes)>) -> Result<Vec<VirtualPath>> {
    for (path, _) in &files {
        ensure!(!path.is_root(), "file path must not be empty");
    }

    let num = files.len();
    let uploaded = stream::iter(files)
        .map(|(path, bytes)| async move {
            op.upload(Stage::Upload, &path.to_key(), bytes).await?;
            Ok::<_, Error>(path)
        })
        .buffer_unordered(op.concurrency())
        .try_collect::<Vec<_>>()
        .await?;
    info!(num, "Upload files");

    Ok(uploaded)
}

pub async fn download(op: &Operation, path: &VirtualPath) -> Result<Bytes> {
    op.download(Stage::Download, &path.to_key()).await
}

/// A missing file is reported as not found, even on stores whose delete is
/// idempotent.
pub async fn delete(op: &Operation, path: &VirtualPath) -> Result<()> {
    let key = path.to_key();
    if !op.exists(Stage::Delete, &key).await? {
        return Err(Error::Store {
            stage: Stage::Delete,
            source: StoreError::not_found(key),
        });
    }
    op.delete(Stage::Delete, &[key]).await?;
    info!(path = %path, "Delete file");

    Ok(())
}

/// Download, upload under the new key, then delete the old key. When the
/// delete fails both keys exist and `Error::CopySucceededDeleteFailed` is
/// returned.
pub async fn rename(op: &Operation, src: &VirtualPath, dest: &VirtualPath) -> Result<()> {
    ensure!(
        !src.is_root() && !dest.is_root(),
        "file path must not be empty"
    );
    if src == dest {
        return Ok(());
    }

    let bytes = op.download(Stage::Copy, &src.to_key()).await?;
    op.upload(Stage::Copy, &dest.to_key(), bytes).await?;

    let delete_op = op.fork();
    if let Err(err) = delete_op.delete(Stage::Delete, &[src.to_key()]).await {
        warn!(src = %src, dest = %dest, err = %err, "File copied but source not deleted");
        return Err(Error::CopySucceededDeleteFailed {
            from: src.to_key(),
            to: dest.to_key(),
            source: Box::new(err),
        });
    }
    info!(src = %src, dest = %dest, "Rename file");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_log::test;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{
        config::FsConfig,
        test_util::{Fault, FaultyStore},
        StoreErrorKind,
    };

    fn op(store: &Arc<FaultyStore>) -> Operation {
        Operation::new(store.clone(), &FsConfig::default(), CancellationToken::new())
    }

    fn path(p: &str) -> VirtualPath {
        VirtualPath::parse(p).unwrap()
    }

    #[test(tokio::test)]
    async fn test_upload_overwrites() {
        let store = Arc::new(FaultyStore::in_memory());
        upload(&op(&store), &path("a.txt"), Bytes::from_static(b"one"))
            .await
            .unwrap();
        upload(&op(&store), &path("a.txt"), Bytes::from_static(b"two"))
            .await
            .unwrap();

        let bytes = download(&op(&store), &path("a.txt")).await.unwrap();
        assert_eq!(bytes.as_ref(), b"two");
    }

    #[test(tokio::test)]
    async fn test_rename_file() {
        let store = Arc::new(FaultyStore::in_memory());
        store.put("docs/old.txt", b"content").await;

        rename(&op(&store), &path("docs/old.txt"), &path("docs/new.txt"))
            .await
            .unwrap();
        assert_eq!(store.all_keys().await, vec!["docs/new.txt"]);
        let bytes = download(&op(&store), &path("docs/new.txt")).await.unwrap();
        assert_eq!(bytes.as_ref(), b"content");
    }

    #[test(tokio::test)]
    async fn test_rename_missing_file_is_clean_failure() {
        let store = Arc::new(FaultyStore::in_memory());
        let err = rename(&op(&store), &path("nope"), &path("other"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store { stage: Stage::Copy, .. }));
        assert_eq!(err.store_kind(), Some(StoreErrorKind::NotFound));
        assert!(store.all_keys().await.is_empty());
    }

    #[test(tokio::test)]
    async fn test_rename_delete_failure_duplicates() {
        let store = Arc::new(FaultyStore::in_memory());
        store.put("x.txt", b"x").await;
        store.inject(Fault::Delete { nth: 1 });

        let err = rename(&op(&store), &path("x.txt"), &path("y.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CopySucceededDeleteFailed { .. }));
        assert_eq!(store.all_keys().await, vec!["x.txt", "y.txt"]);
    }

    #[test(tokio::test)]
    async fn test_delete_file() {
        let store = Arc::new(FaultyStore::in_memory());
        store.put("x.txt", b"x").await;
        delete(&op(&store), &path("x.txt")).await.unwrap();
        assert!(store.all_keys().await.is_empty());

        let err = delete(&op(&store), &path("x.txt")).await.unwrap_err();
        assert!(matches!(err, Error::Store { stage: Stage::Delete, .. }), "{err}");
        assert_eq!(err.store_kind(), Some(StoreErrorKind::NotFound));
        assert_eq!(store.delete_calls(), 1);
    }

    #[test(tokio::test)]
    async fn test_upload_many_reports_partial_failure() {
        let store = Arc::new(FaultyStore::in_memory());
        store.inject(Fault::Upload { nth: 3 });
        let files = (0..3)
            .map(|i| (path(&format!("batch/{i}.bin")), Bytes::from_static(b"b")))
            .collect();

        let err = upload_many(&op(&store), files).await.unwrap_err();
        assert!(
            matches!(err, Error::PartialFailure { stage: Stage::Upload, mutated: 2, .. }),
            "{err}"
        );
        assert_eq!(store.all_keys().await.len(), 2);
    }
}
