use dirsync_lib::config::AppSettings;
use dirsync_lib::logging::{get_log_dir, rotate_if_oversized, LogConfig, LOG_FILE};
use dirsync_lib::{AppState, ItemEvent, ManagerEvent, SynchronizedDirectoriesManager};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

/// 初始化日志系统，返回的 guard 需要保持到进程退出
fn init_logging() -> Option<WorkerGuard> {
    let log_dir = get_log_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let config = LogConfig::load(&log_dir);

    if !config.enabled {
        // 日志已禁用，只初始化一个空的 subscriber
        let subscriber = tracing_subscriber::registry();
        let _ = tracing::subscriber::set_global_default(subscriber);
        return None;
    }

    if let Err(e) = rotate_if_oversized(&log_dir, config.max_size_bytes()) {
        eprintln!("日志轮转失败: {}", e);
    }

    let env_filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(config.tracing_level().into());

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, LOG_FILE));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    // 在 debug 模式下也输出到控制台
    #[cfg(debug_assertions)]
    {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer);

        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    #[cfg(not(debug_assertions))]
    {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer);

        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    Some(guard)
}

fn log_pairs(manager: &SynchronizedDirectoriesManager) {
    for pair in manager.pairs() {
        let summary = pair
            .summary()
            .iter()
            .map(|(kind, count)| format!("{}={}", kind, count))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "{} <-> {}: {} / {} [{}]",
            pair.left().full_path().display(),
            pair.right().full_path().display(),
            pair.left().status().kind(),
            pair.right().status().kind(),
            summary
        );
    }
}

async fn handle_item_event(state: &AppState, event: ItemEvent) {
    match &event {
        ItemEvent::SyncStarted { path } => info!("开始同步: {:?}", path),
        ItemEvent::SyncFinished { path, .. } => info!("同步结束: {:?}", path),
        ItemEvent::SyncError { path, message } => warn!("同步失败 {:?}: {}", path, message),
        ItemEvent::CommandChanged { path } => trace!("命令已更新: {:?}", path),
        ItemEvent::CopiedFromTo { .. } | ItemEvent::Deleted { .. } => {
            let mut manager = state.manager.lock().await;
            if !manager.apply_item_event(&event) {
                debug!("通知没有对应的目录对: {:?}", event);
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_logging();

    let state = AppState::new()?;
    let settings = AppSettings::load(&state.config_dir);
    info!("数据目录: {:?}", state.config_dir);

    {
        let mut manager = state.manager.lock().await;
        manager.load().await;
        log_pairs(&manager);
    }

    let mut ticker = (settings.refresh_interval_secs > 0).then(|| {
        let period = Duration::from_secs(settings.refresh_interval_secs);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    let mut item_events = state.item_events.lock().await;
    let mut pair_events = state.pair_events.lock().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("收到退出信号");
                break;
            }
            Some(event) = item_events.recv() => handle_item_event(&state, event).await,
            Some(event) = pair_events.recv() => match event {
                ManagerEvent::PairAdded(key) => debug!("已添加: {}", key),
                ManagerEvent::PairRemoved(key) => debug!("已移除: {}", key),
                ManagerEvent::DirectoriesLoaded(key) => debug!("已加载: {}", key),
            },
            _ = next_tick(&mut ticker) => {
                let mut manager = state.manager.lock().await;
                let loaded = manager.load().await;
                manager.refresh_except(&loaded).await;
                log_pairs(&manager);
            }
        }
    }

    Ok(())
}
