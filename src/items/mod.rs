pub mod directory;
pub mod factory;
pub mod file;

pub use directory::Directory;
pub use factory::{ItemFactory, LocalItemFactory};
pub use file::File;

use crate::error::ItemError;
use crate::events::{EventSender, ItemEvent};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// 文件系统条目
#[derive(Debug, Clone)]
pub enum Item {
    File(File),
    Directory(Directory),
}

impl Item {
    pub fn name(&self) -> &OsStr {
        match self {
            Item::File(f) => f.name(),
            Item::Directory(d) => d.name(),
        }
    }

    pub fn full_path(&self) -> &Path {
        match self {
            Item::File(f) => f.full_path(),
            Item::Directory(d) => d.full_path(),
        }
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        match self {
            Item::File(f) => f.last_update(),
            Item::Directory(d) => d.last_update(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Item::Directory(_))
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Item::Directory(d) => Some(d),
            Item::File(_) => None,
        }
    }

    /// 复制到目标路径（覆盖已存在的文件）
    ///
    /// 失败时发送 `SyncError` 通知并返回错误；成功时发送 `CopiedFromTo`，
    /// 其中的新条目由工厂在目标位置构造，构造失败时为 `None`。
    pub async fn copy_to(
        item: &Arc<Item>,
        dest_path: &Path,
        factory: &dyn ItemFactory,
        events: &EventSender<ItemEvent>,
    ) -> Result<Option<Arc<Item>>, ItemError> {
        info!("复制: {:?} -> {:?}", item.full_path(), dest_path);

        let copied = match item.as_ref() {
            Item::File(f) => f.copy_to(dest_path).await,
            Item::Directory(d) => d.copy_to(dest_path).await,
        };

        if let Err(e) = copied {
            warn!("复制失败: {}", e);
            events.send(ItemEvent::SyncError {
                path: item.full_path().to_path_buf(),
                message: e.to_string(),
            });
            return Err(e);
        }

        let new_item = match item.as_ref() {
            Item::File(_) => factory.create_file(dest_path).await.map(Item::File),
            Item::Directory(d) => {
                match factory
                    .create_directory(dest_path, d.excluded_extensions().clone())
                    .await
                {
                    Some(mut created) => {
                        created.load().await;
                        Some(Item::Directory(created))
                    }
                    None => None,
                }
            }
        }
        .map(Arc::new);

        if new_item.is_none() {
            warn!("复制完成但无法读取目标: {:?}", dest_path);
        }

        events.send(ItemEvent::CopiedFromTo {
            source: item.clone(),
            dest_path: dest_path.to_path_buf(),
            new_item: new_item.clone(),
        });

        Ok(new_item)
    }

    /// 删除条目；失败时只发送 `SyncError`，不发送 `Deleted`
    pub async fn delete(item: &Arc<Item>, events: &EventSender<ItemEvent>) -> Result<(), ItemError> {
        info!("删除: {:?}", item.full_path());

        let deleted = match item.as_ref() {
            Item::File(f) => f.delete().await,
            Item::Directory(d) => d.delete().await,
        };

        match deleted {
            Ok(()) => {
                events.send(ItemEvent::Deleted { item: item.clone() });
                Ok(())
            }
            Err(e) => {
                warn!("删除失败: {}", e);
                events.send(ItemEvent::SyncError {
                    path: item.full_path().to_path_buf(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

/// 目录对一侧的条目：存在，或在该路径上缺失
#[derive(Debug, Clone)]
pub enum ItemSlot {
    Present(Arc<Item>),
    Absent(PathBuf),
}

impl ItemSlot {
    pub fn from_option(item: Option<Item>, path: impl Into<PathBuf>) -> Self {
        match item {
            Some(item) => ItemSlot::Present(Arc::new(item)),
            None => ItemSlot::Absent(path.into()),
        }
    }

    pub fn item(&self) -> Option<&Arc<Item>> {
        match self {
            ItemSlot::Present(item) => Some(item),
            ItemSlot::Absent(_) => None,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ItemSlot::Present(item) => item.full_path(),
            ItemSlot::Absent(path) => path,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, ItemSlot::Present(_))
    }

    pub fn directory(&self) -> Option<&Directory> {
        self.item().and_then(|item| item.as_directory())
    }
}

/// 加载目录时跳过的扩展名集合（不区分大小写，不含前导点）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: HashSet<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// 读取修改时间
pub(crate) fn modified_time(
    path: &Path,
    metadata: &std::fs::Metadata,
) -> Result<DateTime<Utc>, ItemError> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .map_err(|e| ItemError::io(path, e))
}

/// 取路径最后一段作为名称，保留原始字节
pub(crate) fn file_name(path: &Path) -> OsString {
    path.file_name()
        .unwrap_or_else(|| path.as_os_str())
        .to_os_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter_normalizes() {
        let filter = ExtensionFilter::new([".TMP", "bak", "  .Log "]);
        assert!(filter.is_excluded(Path::new("/a/b.tmp")));
        assert!(filter.is_excluded(Path::new("/a/b.BAK")));
        assert!(filter.is_excluded(Path::new("x.log")));
        assert!(!filter.is_excluded(Path::new("x.txt")));
        assert!(!filter.is_excluded(Path::new("tmp")));
    }

    #[test]
    fn test_empty_filter_excludes_nothing() {
        let filter = ExtensionFilter::new(Vec::<String>::new());
        assert!(filter.is_empty());
        assert!(!filter.is_excluded(Path::new("a.tmp")));
    }

    #[test]
    fn test_absent_slot_keeps_path() {
        let slot = ItemSlot::from_option(None, "/left/a.txt");
        assert!(!slot.is_present());
        assert_eq!(slot.path(), Path::new("/left/a.txt"));
        assert!(slot.directory().is_none());
    }
}
