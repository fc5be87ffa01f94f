//! 目录状态汇总
//!
//! 目录一侧的状态由其子条目同一侧的状态得出：
//! - 任一子条目加载失败 => `LoadError`
//! - 全部 `Equally`（或没有子条目）=> `Equally`
//! - 任一子条目 `Unknown`，或非 `Equally` 的状态不一致 => `Unknown`
//! - 否则取唯一的非 `Equally` 状态，命令为按顺序依次执行各子条目的命令
//!
//! 组合命令执行子命令时会占用子命令的执行标志：正在单独执行的子命令会被跳过并计为失败。

use super::status::{Status, StatusKind};
use super::sync_command::{action, CommandAction, SyncCommand};
use crate::error::ItemError;
use tracing::warn;

pub fn aggregate<'a, I>(children: I) -> (Status, Option<CommandAction>)
where
    I: IntoIterator<Item = (&'a Status, &'a SyncCommand)>,
{
    let mut shared: Option<StatusKind> = None;
    let mut inconsistent = false;
    let mut commands = Vec::new();

    for (status, command) in children {
        match status.kind() {
            StatusKind::Equally => {}
            StatusKind::LoadError => {
                return (Status::from_children(StatusKind::LoadError), None);
            }
            StatusKind::Unknown => inconsistent = true,
            kind => {
                match shared {
                    None => shared = Some(kind),
                    Some(existing) if existing != kind => inconsistent = true,
                    Some(_) => {}
                }
                if command.is_set() {
                    commands.push(command.clone());
                }
            }
        }
    }

    if inconsistent {
        return (Status::from_children(StatusKind::Unknown), None);
    }

    match shared {
        None => (Status::new(StatusKind::Equally), None),
        Some(kind) => (Status::from_children(kind), sequential(commands)),
    }
}

/// 依次执行各子命令；某个失败不影响后续子命令
fn sequential(commands: Vec<SyncCommand>) -> Option<CommandAction> {
    if commands.is_empty() {
        return None;
    }

    Some(action(move || {
        let commands = commands.clone();
        async move {
            let total = commands.len();
            let mut failed = 0;
            for child in &commands {
                if let Err(e) = child.run_in_composite().await {
                    warn!("子操作失败: {}", e);
                    failed += 1;
                }
            }
            if failed > 0 {
                Err(ItemError::Partial { failed, total })
            } else {
                Ok(())
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSender;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    fn recording(log: Arc<Mutex<Vec<usize>>>, id: usize, fail: bool) -> CommandAction {
        action(move || {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(id);
                if fail {
                    Err(ItemError::Partial {
                        failed: 1,
                        total: 1,
                    })
                } else {
                    Ok(())
                }
            }
        })
    }

    fn command(action: Option<CommandAction>) -> SyncCommand {
        let mut command = SyncCommand::new("/child", EventSender::disabled());
        command.set_command_action(action);
        command
    }

    fn kinds(kinds: &[StatusKind]) -> Vec<Status> {
        kinds.iter().map(|k| Status::new(*k)).collect()
    }

    fn idle(statuses: &[Status]) -> (Status, Option<CommandAction>) {
        let idle = command(None);
        aggregate(statuses.iter().map(|s| (s, &idle)))
    }

    #[test]
    fn test_all_equal() {
        let (status, command) = idle(&kinds(&[StatusKind::Equally, StatusKind::Equally]));
        assert_eq!(status.kind(), StatusKind::Equally);
        assert!(command.is_none());
    }

    #[test]
    fn test_no_children_is_equal() {
        let (status, command) = aggregate(std::iter::empty());
        assert_eq!(status.kind(), StatusKind::Equally);
        assert!(command.is_none());
    }

    #[test]
    fn test_mixed_is_unknown() {
        let (status, command) = idle(&kinds(&[StatusKind::Missing, StatusKind::ThereIs]));
        assert_eq!(status.kind(), StatusKind::Unknown);
        assert!(status.comment().is_some());
        assert!(command.is_none());
    }

    #[test]
    fn test_unknown_child_wins_over_shared_status() {
        let (status, _) = idle(&kinds(&[
            StatusKind::Newer,
            StatusKind::Unknown,
            StatusKind::Newer,
        ]));
        assert_eq!(status.kind(), StatusKind::Unknown);
    }

    #[test]
    fn test_load_error_takes_precedence() {
        let (status, command) = idle(&kinds(&[
            StatusKind::Unknown,
            StatusKind::LoadError,
            StatusKind::Newer,
        ]));
        assert_eq!(status.kind(), StatusKind::LoadError);
        assert!(command.is_none());
    }

    #[tokio::test]
    async fn test_shared_status_runs_children_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let statuses = kinds(&[StatusKind::Newer, StatusKind::Equally, StatusKind::Newer]);
        let children = [
            command(Some(recording(log.clone(), 0, false))),
            command(None),
            command(Some(recording(log.clone(), 2, false))),
        ];

        let (status, composite) = aggregate(statuses.iter().zip(children.iter()));

        assert_eq!(status.kind(), StatusKind::Newer);
        composite.unwrap()().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_failed_child_does_not_stop_siblings() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let statuses = kinds(&[StatusKind::ThereIs, StatusKind::ThereIs]);
        let children = [
            command(Some(recording(log.clone(), 0, true))),
            command(Some(recording(log.clone(), 1, false))),
        ];

        let (_, composite) = aggregate(statuses.iter().zip(children.iter()));
        let result = composite.unwrap()().await;

        assert!(matches!(result, Err(ItemError::Partial { failed: 1, total: 2 })));
        assert_eq!(*log.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_composite_skips_child_already_running() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Notify::new());
        let slow = {
            let log = log.clone();
            let gate = gate.clone();
            command(Some(action(move || {
                let log = log.clone();
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    log.lock().unwrap().push(0);
                    Ok(())
                }
            })))
        };
        let statuses = kinds(&[StatusKind::Newer, StatusKind::Newer]);
        let children = [slow.clone(), command(Some(recording(log.clone(), 1, false)))];
        let (_, composite) = aggregate(statuses.iter().zip(children.iter()));
        let composite = composite.unwrap();

        let (alone, combined) = tokio::join!(slow.process(), async {
            let result = composite().await;
            gate.notify_one();
            result
        });

        alone.unwrap();
        assert!(matches!(combined, Err(ItemError::Partial { failed: 1, total: 2 })));
        assert_eq!(*log.lock().unwrap(), vec![1, 0]);
        assert!(!slow.is_running());
        assert!(!children[0].is_running());
    }
}
