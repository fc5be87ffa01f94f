//! 同步命令
//!
//! 命令是绑定在一侧条目上的可替换异步动作，表示“采用这一侧的版本”。
//! 同一命令（包括其克隆）同一时刻最多只有一次执行。

use crate::error::{CommandError, ItemError};
use crate::events::{EventSender, ItemEvent, ManagerEvent};
use crate::items::{Item, ItemFactory};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 命令动作
pub type CommandAction = Arc<dyn Fn() -> BoxFuture<'static, Result<(), ItemError>> + Send + Sync>;

/// 由异步闭包构造动作
pub fn action<F, Fut>(f: F) -> CommandAction
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ItemError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// 构造命令所需的共享依赖
#[derive(Clone)]
pub struct SyncContext {
    pub factory: Arc<dyn ItemFactory>,
    pub item_events: EventSender<ItemEvent>,
    pub pair_events: EventSender<ManagerEvent>,
}

impl SyncContext {
    pub fn new(factory: Arc<dyn ItemFactory>) -> Self {
        Self {
            factory,
            item_events: EventSender::disabled(),
            pair_events: EventSender::disabled(),
        }
    }

    pub fn with_events(
        mut self,
        item_events: EventSender<ItemEvent>,
        pair_events: EventSender<ManagerEvent>,
    ) -> Self {
        self.item_events = item_events;
        self.pair_events = pair_events;
        self
    }

    /// 把条目复制到另一侧的路径
    pub fn copy_action(&self, source: Arc<Item>, dest_path: PathBuf) -> CommandAction {
        let factory = self.factory.clone();
        let events = self.item_events.clone();
        action(move || {
            let source = source.clone();
            let dest_path = dest_path.clone();
            let factory = factory.clone();
            let events = events.clone();
            async move {
                Item::copy_to(&source, &dest_path, factory.as_ref(), &events)
                    .await
                    .map(|_| ())
            }
        })
    }

    /// 删除条目
    pub fn delete_action(&self, item: Arc<Item>) -> CommandAction {
        let events = self.item_events.clone();
        action(move || {
            let item = item.clone();
            let events = events.clone();
            async move { Item::delete(&item, &events).await }
        })
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext").finish_non_exhaustive()
    }
}

/// 同步命令
#[derive(Clone)]
pub struct SyncCommand {
    path: PathBuf,
    action: Option<CommandAction>,
    accepted: Option<Arc<Item>>,
    running: Arc<AtomicBool>,
    events: EventSender<ItemEvent>,
}

impl SyncCommand {
    pub fn new(path: impl Into<PathBuf>, events: EventSender<ItemEvent>) -> Self {
        Self {
            path: path.into(),
            action: None,
            accepted: None,
            running: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn action(&self) -> Option<&CommandAction> {
        self.action.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.action.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 替换动作；与当前动作是同一实例时不做任何事。返回是否发生了变化
    pub fn set_command_action(&mut self, action: Option<CommandAction>) -> bool {
        let unchanged = match (&self.action, &action) {
            (None, None) => true,
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            _ => false,
        };
        if unchanged {
            return false;
        }

        self.action = action;
        self.events.send(ItemEvent::CommandChanged {
            path: self.path.clone(),
        });
        true
    }

    /// 执行完成时随通知一起发出的条目
    pub(crate) fn set_accepted(&mut self, item: Option<Arc<Item>>) {
        self.accepted = item;
    }

    /// 执行动作
    ///
    /// 未设置动作时直接返回；已有执行未结束时返回 `AlreadyRunning`。
    pub async fn process(&self) -> Result<(), CommandError> {
        let Some(action) = self.action.clone() else {
            return Ok(());
        };

        self.enter()?;
        let running = self.running.clone();
        scopeguard::defer! {
            running.store(false, Ordering::SeqCst);
        }

        self.events.send(ItemEvent::SyncStarted {
            path: self.path.clone(),
        });

        let result = action().await;

        self.events.send(ItemEvent::SyncFinished {
            path: self.path.clone(),
            accepted: self.accepted.clone(),
        });

        result.map_err(CommandError::from)
    }

    /// 作为组合命令的一部分执行：同样占用执行标志，但不发送开始 / 结束通知
    pub(crate) async fn run_in_composite(&self) -> Result<(), CommandError> {
        let Some(action) = self.action.clone() else {
            return Ok(());
        };

        self.enter()?;
        let running = self.running.clone();
        scopeguard::defer! {
            running.store(false, Ordering::SeqCst);
        }

        action().await.map_err(CommandError::from)
    }

    fn enter(&self) -> Result<(), CommandError> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| {
                debug!("命令正在执行，忽略: {:?}", self.path);
                CommandError::AlreadyRunning(self.path.clone())
            })
    }
}

impl fmt::Debug for SyncCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCommand")
            .field("path", &self.path)
            .field("is_set", &self.is_set())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn counting_action(counter: Arc<AtomicUsize>) -> CommandAction {
        action(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[test]
    fn test_setting_same_action_is_noop() {
        let (events, mut rx) = EventSender::channel();
        let mut command = SyncCommand::new("/a", events);
        let act = counting_action(Arc::default());

        assert!(command.set_command_action(Some(act.clone())));
        assert!(!command.set_command_action(Some(act)));
        assert!(command.set_command_action(None));
        assert!(!command.set_command_action(None));

        let mut changed = 0;
        while let Ok(ItemEvent::CommandChanged { .. }) = rx.try_recv() {
            changed += 1;
        }
        assert_eq!(changed, 2);
    }

    #[tokio::test]
    async fn test_process_fires_start_and_finish() {
        let (events, mut rx) = EventSender::channel();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut command = SyncCommand::new("/a", events);
        command.set_command_action(Some(counting_action(counter.clone())));
        let _ = rx.try_recv();

        command.process().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(matches!(rx.try_recv(), Ok(ItemEvent::SyncStarted { .. })));
        assert!(matches!(rx.try_recv(), Ok(ItemEvent::SyncFinished { .. })));
        assert!(!command.is_running());
    }

    #[tokio::test]
    async fn test_process_without_action_is_silent() {
        let (events, mut rx) = EventSender::channel();
        let command = SyncCommand::new("/a", events);
        command.process().await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_overlapping_process_is_rejected() {
        let gate = Arc::new(Notify::new());
        let entered = Arc::new(Notify::new());
        let mut command = SyncCommand::new("/a", EventSender::disabled());
        {
            let gate = gate.clone();
            let entered = entered.clone();
            command.set_command_action(Some(action(move || {
                let gate = gate.clone();
                let entered = entered.clone();
                async move {
                    entered.notify_one();
                    gate.notified().await;
                    Ok(())
                }
            })));
        }

        let first = command.clone();
        let handle = tokio::spawn(async move { first.process().await });
        entered.notified().await;

        let second = command.process().await;
        assert!(matches!(second, Err(CommandError::AlreadyRunning(_))));

        gate.notify_one();
        handle.await.unwrap().unwrap();
        assert!(!command.is_running());
    }

    #[tokio::test]
    async fn test_failed_action_still_finishes() {
        let (events, mut rx) = EventSender::channel();
        let mut command = SyncCommand::new("/a", events);
        command.set_command_action(Some(action(|| async {
            Err(ItemError::Partial {
                failed: 1,
                total: 1,
            })
        })));
        let _ = rx.try_recv();

        assert!(command.process().await.is_err());
        assert!(matches!(rx.try_recv(), Ok(ItemEvent::SyncStarted { .. })));
        assert!(matches!(rx.try_recv(), Ok(ItemEvent::SyncFinished { .. })));
        assert!(!command.is_running());
    }
}
