use super::{file_name, modified_time, ExtensionFilter, File, Item};
use crate::error::ItemError;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// 目录
///
/// 子条目按“先目录、后文件”排列，每组按名称排序。重新加载会整体替换子条目列表。
#[derive(Debug, Clone)]
pub struct Directory {
    name: OsString,
    full_path: PathBuf,
    last_update: DateTime<Utc>,
    items: Vec<Arc<Item>>,
    is_loaded: bool,
    last_load_error: Option<String>,
    excluded_extensions: Arc<ExtensionFilter>,
}

/// 一次枚举的结果
struct Listing {
    last_update: DateTime<Utc>,
    directories: Vec<Directory>,
    files: Vec<File>,
}

impl Directory {
    /// 读取路径上的目录信息（不加载子条目）
    pub async fn open(
        path: impl Into<PathBuf>,
        excluded_extensions: Arc<ExtensionFilter>,
    ) -> Result<Self, ItemError> {
        let full_path = path.into();
        let metadata = fs::metadata(&full_path)
            .await
            .map_err(|e| ItemError::io(&full_path, e))?;
        if !metadata.is_dir() {
            return Err(ItemError::NotADirectory(full_path));
        }
        Self::from_metadata(full_path, &metadata, excluded_extensions)
    }

    fn from_metadata(
        full_path: PathBuf,
        metadata: &std::fs::Metadata,
        excluded_extensions: Arc<ExtensionFilter>,
    ) -> Result<Self, ItemError> {
        Ok(Self {
            name: file_name(&full_path),
            last_update: modified_time(&full_path, metadata)?,
            full_path,
            items: Vec::new(),
            is_loaded: false,
            last_load_error: None,
            excluded_extensions,
        })
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn items(&self) -> &[Arc<Item>] {
        &self.items
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn last_load_error(&self) -> Option<&str> {
        self.last_load_error.as_deref()
    }

    pub fn excluded_extensions(&self) -> &Arc<ExtensionFilter> {
        &self.excluded_extensions
    }

    /// 枚举子目录和文件，再并发递归加载每个子目录
    ///
    /// 枚举失败不会返回错误，而是记录在 `last_load_error` 中并清空子条目。
    pub fn load(&mut self) -> BoxFuture<'_, ()> {
        async move {
            match Self::list(&self.full_path, self.excluded_extensions.clone()).await {
                Ok(listing) => {
                    let mut directories = listing.directories;
                    join_all(directories.iter_mut().map(|d| d.load())).await;

                    self.items = directories
                        .into_iter()
                        .map(Item::Directory)
                        .chain(listing.files.into_iter().map(Item::File))
                        .map(Arc::new)
                        .collect();
                    self.last_update = listing.last_update;
                    self.last_load_error = None;
                }
                Err(e) => {
                    warn!("加载目录失败: {}", e);
                    self.items.clear();
                    self.last_load_error = Some(e.to_string());
                }
            }
            self.is_loaded = true;
        }
        .boxed()
    }

    /// 单层枚举，在阻塞线程池中执行
    async fn list(path: &Path, excluded: Arc<ExtensionFilter>) -> Result<Listing, ItemError> {
        let root = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let metadata = std::fs::metadata(&root).map_err(|e| ItemError::io(&root, e))?;
            if !metadata.is_dir() {
                return Err(ItemError::NotADirectory(root));
            }
            let last_update = modified_time(&root, &metadata)?;

            let mut directories = Vec::new();
            let mut files = Vec::new();

            for entry in WalkDir::new(&root)
                .min_depth(1)
                .max_depth(1)
                .follow_links(false)
            {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) if e.depth() == 0 => {
                        let io = e.into_io_error().unwrap_or_else(|| {
                            std::io::Error::new(std::io::ErrorKind::Other, "无法枚举目录")
                        });
                        return Err(ItemError::io(&root, io));
                    }
                    Err(e) => {
                        debug!("跳过无法读取的条目: {}", e);
                        continue;
                    }
                };

                let file_type = entry.file_type();
                let entry_path = entry.path().to_path_buf();
                let metadata = match entry.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        debug!("跳过无法读取的条目: {}", e);
                        continue;
                    }
                };

                if file_type.is_dir() {
                    directories.push(Directory::from_metadata(
                        entry_path,
                        &metadata,
                        excluded.clone(),
                    )?);
                } else if file_type.is_file() {
                    if excluded.is_excluded(&entry_path) {
                        debug!("排除文件: {:?}", entry_path);
                        continue;
                    }
                    files.push(File::from_metadata(entry_path, &metadata)?);
                } else {
                    debug!("跳过符号链接或特殊文件: {:?}", entry_path);
                }
            }

            directories.sort_by(|a, b| a.name.cmp(&b.name));
            files.sort_by(|a, b| a.name().cmp(b.name()));

            Ok(Listing {
                last_update,
                directories,
                files,
            })
        })
        .await?
    }

    /// 递归复制整个目录，最后恢复目标目录的修改时间
    pub(crate) async fn copy_to(&self, dest_path: &Path) -> Result<(), ItemError> {
        if self.is_loaded {
            self.copy_tree(dest_path).await
        } else {
            let mut loaded = self.clone();
            loaded.load().await;
            loaded.copy_tree(dest_path).await
        }
    }

    fn copy_tree<'a>(&'a self, dest_path: &'a Path) -> BoxFuture<'a, Result<(), ItemError>> {
        async move {
            if let Some(error) = &self.last_load_error {
                return Err(ItemError::io(
                    &self.full_path,
                    std::io::Error::new(std::io::ErrorKind::Other, error.clone()),
                ));
            }

            fs::create_dir_all(dest_path)
                .await
                .map_err(|e| ItemError::io(dest_path, e))?;

            for item in &self.items {
                let target = dest_path.join(item.name());
                match item.as_ref() {
                    Item::File(f) => f.copy_to(&target).await?,
                    Item::Directory(d) => d.copy_tree(&target).await?,
                }
            }

            let metadata = fs::metadata(&self.full_path)
                .await
                .map_err(|e| ItemError::io(&self.full_path, e))?;
            filetime::set_file_mtime(dest_path, FileTime::from_last_modification_time(&metadata))
                .map_err(|e| ItemError::io(dest_path, e))?;
            Ok(())
        }
        .boxed()
    }

    pub(crate) async fn delete(&self) -> Result<(), ItemError> {
        fs::remove_dir_all(&self.full_path)
            .await
            .map_err(|e| ItemError::io(&self.full_path, e))
    }
}
