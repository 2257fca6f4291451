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

//! Pure helpers for virtual paths over flat store keys. Nothing here touches
//! the store.

use std::{fmt, str::FromStr};

use crate::{ensure, Error, Result};

pub const SEPARATOR: char = '/';

/// Reserved name of the zero-byte object that keeps an otherwise empty
/// folder visible.
pub const FOLDER_MARKER: &str = ".folder";

/// Concatenates `base` and `segment`, omitting the separator for an empty
/// base.
pub fn join(base: &str, segment: &str) -> String {
    let base = base.trim_end_matches(SEPARATOR);
    let segment = segment.trim_start_matches(SEPARATOR);
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{base}{SEPARATOR}{segment}")
    }
}

/// Drops the last segment. The parent of the root is the root.
pub fn parent(path: &str) -> String {
    let mut segs = segments(path);
    segs.pop();
    segs.join("/")
}

/// Splits on the separator, so repeated, leading and trailing separators
/// collapse.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

pub fn is_folder_marker_key(key: &str) -> bool {
    key.rsplit(SEPARATOR).next() == Some(FOLDER_MARKER)
}

/// Checks a user supplied file or folder name.
pub fn validate_name(name: &str) -> Result<()> {
    ensure!(!name.trim().is_empty(), "name must not be empty");
    ensure!(
        !name.contains(SEPARATOR),
        "name:{name:?} must not contain {SEPARATOR:?}"
    );
    ensure!(
        name != "." && name != "..",
        "name:{name:?} is not allowed"
    );
    ensure!(
        name != FOLDER_MARKER,
        "name:{name:?} is reserved for folder markers"
    );
    ensure!(
        !name.chars().any(char::is_control),
        "name:{name:?} must not contain control characters"
    );

    Ok(())
}

/// Shape of a store key relative to a listing prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape<'a> {
    /// `<prefix>/<name>`, a file at this level.
    File(&'a str),
    /// `<prefix>/<name>/.folder`, the marker of a direct subfolder.
    FolderMarker(&'a str),
    /// `<prefix>/.folder`, the marker of the listed folder itself.
    OwnMarker,
    /// Deeper than this level, or not under the prefix at all.
    Other,
}

/// Classifies `key` relative to the listing `prefix` by the segments left
/// after stripping the prefix.
pub fn classify_key<'a>(prefix: &str, key: &'a str) -> KeyShape<'a> {
    let prefix = prefix.trim_matches(SEPARATOR);
    let suffix = if prefix.is_empty() {
        key
    } else {
        match key
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
        {
            Some(rest) => rest,
            None => return KeyShape::Other,
        }
    };

    match segments(suffix)[..] {
        [name] if name == FOLDER_MARKER => KeyShape::OwnMarker,
        [name] => KeyShape::File(name),
        [name, marker] if marker == FOLDER_MARKER => KeyShape::FolderMarker(name),
        _ => KeyShape::Other,
    }
}

/// A normalized location in the virtual hierarchy. The empty path is the
/// root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualPath {
    segments: Vec<String>,
}

impl VirtualPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Normalizes `path` without validating segment names. Used for keys
    /// that come back from the store.
    pub fn normalize(path: &str) -> Self {
        Self {
            segments: segments(path).into_iter().map(String::from).collect(),
        }
    }

    /// Normalizes `path` and validates every segment.
    pub fn parse(path: &str) -> Result<Self> {
        let path = Self::normalize(path);
        for segment in &path.segments {
            validate_name(segment)?;
        }
        Ok(path)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Appends a validated name.
    pub fn join(&self, name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(self.child(name))
    }

    /// Appends `name` as is. Callers must have validated it or taken it
    /// from the store.
    pub(crate) fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Appends every segment of `relative`.
    pub fn join_relative(&self, relative: &VirtualPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    /// True when `self` equals `ancestor` or lies beneath it.
    pub fn starts_with(&self, ancestor: &VirtualPath) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    /// Store key (or listing prefix) of this path.
    pub fn to_key(&self) -> String {
        self.segments.join("/")
    }

    /// Store key of this folder's marker object.
    pub fn marker_key(&self) -> String {
        join(&self.to_key(), FOLDER_MARKER)
    }

    /// Maps `key`, which lies under `self`, to the same relative location
    /// under `dest`.
    pub(crate) fn rebase_key(&self, key: &str, dest: &VirtualPath) -> Result<String> {
        let relative = VirtualPath::normalize(key);
        ensure!(
            relative.starts_with(self),
            Error::Internal(anyhow::anyhow!(
                "key:{key} is not under {self}, can't rebase to {dest}"
            ))
        );
        let rest = VirtualPath {
            segments: relative.segments[self.segments.len()..].to_vec(),
        };
        Ok(dest.join_relative(&rest).to_key())
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

impl FromStr for VirtualPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
