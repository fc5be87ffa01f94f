//! 错误类型
//!
//! 文件系统错误在操作边界被捕获并转换为通知，这里的类型只用于
//! 让调用方（以及测试）能够直接检查操作结果。

use std::path::PathBuf;
use thiserror::Error;

/// 文件 / 目录操作错误
#[derive(Debug, Error)]
pub enum ItemError {
    /// 底层 I/O 失败
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 路径存在但不是目录
    #[error("不是目录: {0}")]
    NotADirectory(PathBuf),

    /// 后台任务异常退出
    #[error("后台任务失败: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// 组合命令中部分子命令失败
    #[error("{failed}/{total} 个子操作失败")]
    Partial { failed: usize, total: usize },
}

impl ItemError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// 同步命令执行错误
#[derive(Debug, Error)]
pub enum CommandError {
    /// 同一命令已有一次执行尚未结束
    #[error("命令正在执行: {0}")]
    AlreadyRunning(PathBuf),

    #[error(transparent)]
    Action(#[from] ItemError),
}
