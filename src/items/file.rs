use super::{file_name, modified_time};
use crate::error::ItemError;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// 普通文件
#[derive(Debug, Clone)]
pub struct File {
    name: OsString,
    full_path: PathBuf,
    last_update: DateTime<Utc>,
}

impl File {
    /// 读取路径上的文件信息
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ItemError> {
        let full_path = path.into();
        let metadata = fs::metadata(&full_path)
            .await
            .map_err(|e| ItemError::io(&full_path, e))?;
        if metadata.is_dir() {
            return Err(ItemError::io(
                &full_path,
                std::io::Error::new(std::io::ErrorKind::Other, "路径是目录"),
            ));
        }
        Self::from_metadata(full_path, &metadata)
    }

    pub(crate) fn from_metadata(
        full_path: PathBuf,
        metadata: &std::fs::Metadata,
    ) -> Result<Self, ItemError> {
        Ok(Self {
            name: file_name(&full_path),
            last_update: modified_time(&full_path, metadata)?,
            full_path,
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

    /// 复制内容并保留源文件的修改时间
    pub(crate) async fn copy_to(&self, dest_path: &Path) -> Result<(), ItemError> {
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ItemError::io(parent, e))?;
        }

        let bytes = fs::copy(&self.full_path, dest_path)
            .await
            .map_err(|e| ItemError::io(dest_path, e))?;

        let metadata = fs::metadata(&self.full_path)
            .await
            .map_err(|e| ItemError::io(&self.full_path, e))?;
        filetime::set_file_mtime(dest_path, FileTime::from_last_modification_time(&metadata))
            .map_err(|e| ItemError::io(dest_path, e))?;

        debug!("  写入完成: {:?} ({}字节)", dest_path, bytes);
        Ok(())
    }

    pub(crate) async fn delete(&self) -> Result<(), ItemError> {
        fs::remove_file(&self.full_path)
            .await
            .map_err(|e| ItemError::io(&self.full_path, e))
    }
}
