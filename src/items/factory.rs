use super::{Directory, ExtensionFilter, File};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// 条目工厂
///
/// 构造失败（路径消失、无权限等）一律返回 `None`，调用方应将其视为“不存在”。
#[async_trait]
pub trait ItemFactory: Send + Sync {
    async fn create_directory(
        &self,
        path: &Path,
        excluded_extensions: Arc<ExtensionFilter>,
    ) -> Option<Directory>;

    async fn create_file(&self, path: &Path) -> Option<File>;
}

/// 本地文件系统工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalItemFactory;

#[async_trait]
impl ItemFactory for LocalItemFactory {
    async fn create_directory(
        &self,
        path: &Path,
        excluded_extensions: Arc<ExtensionFilter>,
    ) -> Option<Directory> {
        match Directory::open(path, excluded_extensions).await {
            Ok(dir) => Some(dir),
            Err(e) => {
                debug!("目录不可用: {}", e);
                None
            }
        }
    }

    async fn create_file(&self, path: &Path) -> Option<File> {
        match File::open(path).await {
            Ok(file) => Some(file),
            Err(e) => {
                debug!("文件不可用: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_paths_are_absent() {
        let root = tempfile::tempdir().unwrap();
        let factory = LocalItemFactory;

        assert!(factory
            .create_directory(&root.path().join("nope"), Arc::default())
            .await
            .is_none());
        assert!(factory.create_file(&root.path().join("nope.txt")).await.is_none());
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_absent() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("f.txt");
        std::fs::write(&file, "").unwrap();
        let factory = LocalItemFactory;

        assert!(factory.create_directory(&file, Arc::default()).await.is_none());
        assert!(factory.create_file(root.path()).await.is_none());
        assert!(factory.create_file(&file).await.is_some());
    }
}
