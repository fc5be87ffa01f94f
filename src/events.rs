//! 通知
//!
//! 每类通知一个通道：条目级（复制、删除、命令执行）与管理器级
//! （目录对增删、加载完成）。发送端可以为空，此时通知被丢弃。

use crate::config::PairKey;
use crate::items::Item;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 条目级通知
#[derive(Debug, Clone)]
pub enum ItemEvent {
    /// 同步命令开始执行
    SyncStarted { path: PathBuf },
    /// 同步命令执行结束，携带被采纳一侧的条目
    SyncFinished {
        path: PathBuf,
        accepted: Option<Arc<Item>>,
    },
    /// 复制或删除失败
    SyncError { path: PathBuf, message: String },
    /// 复制成功；目标位置的新条目可能构造失败
    CopiedFromTo {
        source: Arc<Item>,
        dest_path: PathBuf,
        new_item: Option<Arc<Item>>,
    },
    /// 删除成功
    Deleted { item: Arc<Item> },
    /// 条目的同步命令被替换
    CommandChanged { path: PathBuf },
}

/// 管理器级通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    PairAdded(PairKey),
    PairRemoved(PairKey),
    /// 目录对两侧都已加载完成
    DirectoriesLoaded(PairKey),
}

/// 可选的通知发送端
#[derive(Debug)]
pub struct EventSender<T> {
    tx: Option<mpsc::UnboundedSender<T>>,
}

impl<T> EventSender<T> {
    /// 创建通道，返回发送端和接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// 不投递任何通知的发送端
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: T) {
        if let Some(tx) = &self.tx {
            // 接收端已关闭时忽略
            let _ = tx.send(event);
        }
    }
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> Default for EventSender<T> {
    fn default() -> Self {
        Self::disabled()
    }
}
