// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn context(state_dir: &Path, kind: DaemonKind) -> DaemonContext {
    DaemonContext::new(kind, state_dir, Duration::from_millis(10))
}

fn config(state_dir: &Path) -> Config {
    Config {
        state_dir: state_dir.to_path_buf(),
        ..Config::default()
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

#[test]
fn args_name_daemon_and_optional_config() {
    let args = Args::parse(&strings(&["observer"])).unwrap();
    assert_eq!(args.kind, DaemonKind::Observer);
    assert_eq!(args.config, None);

    let args = Args::parse(&strings(&["service", "/etc/flotilla.toml"])).unwrap();
    assert_eq!(args.config, Some(PathBuf::from("/etc/flotilla.toml")));

    assert!(matches!(Args::parse(&[]), Err(LifecycleError::Usage)));
    assert!(matches!(
        Args::parse(&strings(&["worker"])),
        Err(LifecycleError::UnknownDaemon(_))
    ));
}

#[test]
fn intervals_come_from_each_section() {
    let mut config = Config::default();
    config.submitter.interval = Duration::from_secs(5);
    config.observer.interval = Duration::from_secs(7);
    assert_eq!(interval(&config, DaemonKind::Submitter), Duration::from_secs(5));
    assert_eq!(interval(&config, DaemonKind::Observer), Duration::from_secs(7));
    assert_eq!(interval(&config, DaemonKind::Service), Duration::from_secs(60));
}

#[test]
fn pid_lock_writes_pid_and_excludes_second_instance() {
    let dir = TempDir::new().unwrap();
    let path = DaemonKind::Submitter.pid_path(dir.path());

    let lock = PidLock::acquire(DaemonKind::Submitter, &path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.trim(), std::process::id().to_string());

    let second = PidLock::acquire(DaemonKind::Submitter, &path);
    assert!(matches!(second, Err(LifecycleError::LockFailed(..))));
    // The failed attempt must not clobber the running instance's pid
    assert_eq!(std::fs::read_to_string(&path).unwrap(), content);

    lock.release();
    assert!(!path.exists());
}

#[test]
fn startup_marker_is_appended() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path(), DaemonKind::Observer);

    write_startup_marker(&ctx).unwrap();
    write_startup_marker(&ctx).unwrap();

    let log = std::fs::read_to_string(&ctx.log_path).unwrap();
    let markers: Vec<&str> = log
        .lines()
        .filter(|line| line.starts_with(STARTUP_MARKER_PREFIX))
        .collect();
    assert_eq!(markers.len(), 2);
    assert!(markers[0].contains("observer: starting (pid: "));
}

#[test]
fn startup_error_is_written_to_log() {
    let dir = TempDir::new().unwrap();
    let ctx = context(dir.path(), DaemonKind::Submitter);
    write_startup_error(&ctx, &LifecycleError::Usage);

    let log = std::fs::read_to_string(&ctx.log_path).unwrap();
    assert!(log.contains("ERROR Failed to start submitter: usage"));
}

#[test]
fn startup_takes_lock_and_opens_store() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let ctx = context(dir.path(), DaemonKind::Service);

    let (lock, store) = startup(&ctx, &config).unwrap();
    assert!(ctx.pid_path.exists());
    assert!(store.state().runs.is_empty());

    shutdown(&ctx, lock);
    assert!(!ctx.pid_path.exists());
}

#[tokio::test]
async fn service_runs_until_cancelled() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let ctx = context(dir.path(), DaemonKind::Service);
    let (lock, store) = startup(&ctx, &config).unwrap();

    ctx.cancel.cancel();
    let cycles = run(&ctx, config.clone(), store).await;

    assert_eq!(cycles, 1);
    assert!(config.cache_path().exists());
    shutdown(&ctx, lock);
}
