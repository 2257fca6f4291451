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

//! Folder lifecycle on top of flat keys. The store has no rename, move or
//! transaction, so every operation here is a sequence of independent calls
//! and a failure leaves whatever already happened in place.

use bytes::Bytes;
use futures::{future::BoxFuture, stream, FutureExt, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::{
    ensure,
    operation::Operation,
    path::{FOLDER_MARKER, VirtualPath},
    Error, Result, Stage, StoreError,
};

/// Writes the zero byte marker of `parent/name`. Creating an existing folder
/// just overwrites its marker.
pub async fn create(op: &Operation, parent: &VirtualPath, name: &str) -> Result<VirtualPath> {
    let folder = parent.join(name)?;
    op.upload(Stage::Upload, &folder.marker_key(), Bytes::new())
        .await?;
    info!(folder = %folder, "Create folder");

    Ok(folder)
}

/// Deletes every key beneath `folder`, sub folders first and each level's
/// own marker last, so an interrupted delete leaves the folder visible.
///
/// Returns the number of deleted keys. A folder without any key is reported
/// as not found.
pub async fn delete_recursive(op: &Operation, folder: &VirtualPath) -> Result<usize> {
    ensure!(!folder.is_root(), "refuse to delete the root folder");

    let deleted = delete_level(op, folder.clone()).await?;
    if deleted == 0 {
        return Err(Error::Store {
            stage: Stage::Delete,
            source: StoreError::not_found(folder.to_key()),
        });
    }
    info!(folder = %folder, deleted, "Delete folder");

    Ok(deleted)
}

fn delete_level(op: &Operation, folder: VirtualPath) -> BoxFuture<'_, Result<usize>> {
    async move {
        let listing = op.list_all(&folder.to_key()).await?;

        let mut deleted = 0;
        for sub_prefix in &listing.common_prefixes {
            deleted += delete_level(op, VirtualPath::normalize(sub_prefix)).await?;
        }

        let marker = folder.marker_key();
        let (markers, mut keys): (Vec<_>, Vec<_>) =
            listing.keys.into_iter().partition(|key| *key == marker);
        keys.extend(markers);
        op.delete(Stage::Delete, &keys).await?;
        debug!(folder = %folder, num = keys.len(), "Delete folder level");

        Ok(deleted + keys.len())
    }
    .boxed()
}

/// Copies every key beneath `src` to the same relative key beneath `dest`
/// by downloading and uploading the bytes. Files of one level are copied
/// concurrently, sub folders after them, the marker last. A missing marker
/// is fine, the folder may only exist through its descendants.
///
/// Keys already written under `dest` are kept when the copy fails.
pub(crate) async fn copy_recursive(
    op: &Operation,
    src: &VirtualPath,
    dest: &VirtualPath,
) -> Result<usize> {
    let copied = copy_level(op, src.clone(), dest.clone()).await?;
    if copied == 0 {
        return Err(Error::Store {
            stage: Stage::Copy,
            source: StoreError::not_found(src.to_key()),
        });
    }

    Ok(copied)
}

fn copy_level<'a>(
    op: &'a Operation,
    src: VirtualPath,
    dest: VirtualPath,
) -> BoxFuture<'a, Result<usize>> {
    async move {
        let listing = op.list_all(&src.to_key()).await?;
        let marker = src.marker_key();

        let targets = listing
            .keys
            .iter()
            .filter(|key| **key != marker)
            .map(|key| Ok((key.clone(), src.rebase_key(key, &dest)?)))
            .collect::<Result<Vec<(String, String)>>>()?;
        let mut copied = targets.len();
        stream::iter(targets)
            .map(|(from, to)| async move {
                let bytes = op.download(Stage::Copy, &from).await?;
                op.upload(Stage::Copy, &to, bytes).await
            })
            .buffer_unordered(op.concurrency())
            .try_collect::<Vec<_>>()
            .await?;

        for sub_prefix in &listing.common_prefixes {
            let sub_src = VirtualPath::normalize(sub_prefix);
            let sub_dest = VirtualPath::normalize(&src.rebase_key(sub_prefix, &dest)?);
            copied += copy_level(op, sub_src, sub_dest).await?;
        }

        if let Some(bytes) = op.download_if_exists(Stage::Copy, &marker).await? {
            op.upload(Stage::Copy, &dest.marker_key(), bytes).await?;
            copied += 1;
        } else {
            debug!(folder = %src, "No {FOLDER_MARKER} to copy");
        }

        Ok(copied)
    }
    .boxed()
}

/// Moves `src` to `dest` as a copy followed by a delete of `src`. The two
/// phases are not atomic: when the delete fails the result is
/// `Error::CopySucceededDeleteFailed` and both folders are live.
pub async fn rename(op: &Operation, src: &VirtualPath, dest: &VirtualPath) -> Result<()> {
    ensure!(!src.is_root(), "the root folder can't be moved");
    if src == dest {
        return Ok(());
    }
    ensure!(
        !dest.starts_with(src),
        "can't move folder:{src} into itself, dest:{dest}"
    );
    // The copy would land inside the tree the delete removes afterwards.
    ensure!(
        !src.starts_with(dest),
        "can't move folder:{src} onto its ancestor, dest:{dest}"
    );

    let copied = copy_recursive(op, src, dest).await?;
    debug!(src = %src, dest = %dest, copied, "Copy folder for rename");

    let delete_op = op.fork();
    if let Err(err) = delete_recursive(&delete_op, src).await {
        warn!(src = %src, dest = %dest, err = %err, "Folder copied but source not deleted");
        return Err(Error::CopySucceededDeleteFailed {
            from: src.to_key(),
            to: dest.to_key(),
            source: Box::new(err),
        });
    }
    info!(src = %src, dest = %dest, "Rename folder");

    Ok(())
}
