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

mod config;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use config::{Config, StoreConfig};
use object_store::{local::LocalFileSystem, memory::InMemory, ObjectStore};
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use virtual_fs::{
    store::{CloudObjectStore, ObjectStoreAdapterRef},
    DirectoryEntry, Error, VirtualFileSystem, VirtualPath,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Args {
    /// Config file path, defaults apply when absent
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a folder, folders first
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Create a folder under a parent folder
    Mkdir { parent: String, name: String },
    /// Delete a file, or a folder and everything beneath it
    Rm {
        path: String,
        /// Target the folder when a file has the same name
        #[arg(long)]
        folder: bool,
    },
    /// Rename a file or folder within its parent
    Mv {
        path: String,
        new_name: String,
        #[arg(long)]
        folder: bool,
    },
    /// Upload one local file into a folder
    Put { local_file: PathBuf, dest_dir: String },
    /// Upload a local directory tree into a folder
    PutDir { local_dir: PathBuf, dest_dir: String },
    /// Download a file
    Get { path: String, out_file: PathBuf },
    /// Print the public URL of a file
    Url { path: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            let body = fs::read_to_string(path)
                .with_context(|| format!("read config file failed, path:{path}"))?;
            toml::from_str::<Config>(&body).context("parse config failed")?
        }
        None => Config::default(),
    };
    info!(config = ?config, "Config loaded");

    let rt = build_runtime(config.runtime.worker_threads)?;
    rt.block_on(async move {
        let fs = VirtualFileSystem::new(build_store(&config)?, config.fs.clone());
        run(&fs, args.command).await
    })
}

fn build_runtime(workers: usize) -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .thread_name("vfs-worker")
        .worker_threads(workers.max(1))
        .enable_all()
        .build()
        .context("build tokio runtime")
}

fn build_store(config: &Config) -> anyhow::Result<ObjectStoreAdapterRef> {
    let store: Arc<dyn ObjectStore> = match &config.store {
        StoreConfig::Local(v) => {
            fs::create_dir_all(&v.data_dir)
                .with_context(|| format!("create data dir failed, path:{}", v.data_dir))?;
            Arc::new(
                LocalFileSystem::new_with_prefix(&v.data_dir)
                    .with_context(|| format!("open local store failed, path:{}", v.data_dir))?,
            )
        }
        StoreConfig::Memory => Arc::new(InMemory::new()),
    };

    Ok(Arc::new(CloudObjectStore::new(
        store,
        config.fs.public_base_url.clone(),
    )))
}

async fn run(fs: &VirtualFileSystem, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Ls { path } => {
            let path = VirtualPath::parse(&path)?;
            for entry in fs.list_directory(&path).await? {
                match entry {
                    DirectoryEntry::Folder(v) => println!("{}/", v.name),
                    DirectoryEntry::File(v) => println!("{}\t{}", v.name, v.public_url),
                }
            }
        }
        Command::Mkdir { parent, name } => {
            let folder = fs
                .create_folder(&VirtualPath::parse(&parent)?, &name)
                .await?;
            println!("created {}", folder.full_path);
        }
        Command::Rm { path, folder } => {
            let entry = resolve(fs, &path, folder).await?;
            fs.delete_entry(&entry).await?;
            println!("deleted {}", entry.full_path());
        }
        Command::Mv {
            path,
            new_name,
            folder,
        } => {
            let entry = resolve(fs, &path, folder).await?;
            match fs.rename_entry(&entry, &new_name).await {
                Ok(renamed) => println!("renamed {} to {}", entry.full_path(), renamed.full_path()),
                Err(Error::CopySucceededDeleteFailed { from, to, source }) => {
                    warn!(from = %from, to = %to, err = %source, "Rename left two copies");
                    bail!("copied {from} to {to} but {from} could not be removed, both now exist: {source}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Put {
            local_file,
            dest_dir,
        } => {
            let name = local_file
                .file_name()
                .and_then(|v| v.to_str())
                .with_context(|| format!("invalid file name, path:{}", local_file.display()))?
                .to_string();
            let bytes = tokio::fs::read(&local_file)
                .await
                .with_context(|| format!("read local file failed, path:{}", local_file.display()))?;
            let path = VirtualPath::parse(&dest_dir)?.join(&name)?;
            let file = fs.upload_file(&path, Bytes::from(bytes)).await?;
            println!("uploaded {}\t{}", file.full_path, file.public_url);
        }
        Command::PutDir {
            local_dir,
            dest_dir,
        } => {
            let mut pairs = Vec::new();
            collect_files(&local_dir, &local_dir, &mut pairs)?;
            let num = pairs.len();
            let uploaded = fs
                .upload_files_under_relative_paths(&VirtualPath::parse(&dest_dir)?, pairs)
                .await?;
            println!("uploaded {} of {num} files", uploaded.len());
        }
        Command::Get { path, out_file } => {
            let bytes = fs.download_file(&VirtualPath::parse(&path)?).await?;
            tokio::fs::write(&out_file, &bytes)
                .await
                .with_context(|| format!("write local file failed, path:{}", out_file.display()))?;
            println!("downloaded {} bytes to {}", bytes.len(), out_file.display());
        }
        Command::Url { path } => {
            println!("{}", fs.public_url(&VirtualPath::parse(&path)?));
        }
    }

    Ok(())
}

async fn resolve(fs: &VirtualFileSystem, path: &str, folder: bool) -> anyhow::Result<DirectoryEntry> {
    let path = VirtualPath::parse(path)?;
    if let Some(entry) = fs.find_entry(&path, folder).await? {
        return Ok(entry);
    }
    // Fall back to the other kind when the name is unambiguous.
    match fs.find_entry(&path, !folder).await? {
        Some(entry) if !folder => Ok(entry),
        _ => bail!("no entry at {path}"),
    }
}

/// Walks `dir` and collects every file with its path relative to `root`.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, Bytes)>) -> anyhow::Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read dir failed, path:{}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .context("walked outside of the upload root")?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = fs::read(&path).with_context(|| format!("read file failed, path:{}", path.display()))?;
        out.push((relative, Bytes::from(bytes)));
    }

    Ok(())
}
