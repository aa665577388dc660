//! Background reloading on SIGHUP or on request.
//!
//! [`Strata::watch`] spawns a task that waits for a hang-up signal (unix only)
//! or an explicit [`ReloadHandle::reload`] call, then runs [`Strata::reload`]
//! on the blocking pool. Triggers are handled one at a time; a signal that
//! arrives mid-reload is picked up once the running reload finishes.

use std::io;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Strata;
use crate::bind::Bind;

const REQUEST_CAPACITY: usize = 16;

#[cfg(unix)]
struct Hangup(tokio::signal::unix::Signal);

#[cfg(unix)]
impl Hangup {
    fn new() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self(signal(SignalKind::hangup())?))
    }

    async fn recv(&mut self) -> Option<()> {
        self.0.recv().await
    }
}

#[cfg(not(unix))]
struct Hangup;

#[cfg(not(unix))]
impl Hangup {
    fn new() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}

/// Handle to a running reload watcher.
///
/// Dropping this handle stops the watcher.
pub struct ReloadHandle {
    requests: mpsc::Sender<oneshot::Sender<bool>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReloadHandle {
    /// Ask the watcher to reload now. Resolves to `true` when the file had
    /// changed and was applied, `false` otherwise (including when the watcher
    /// has stopped).
    pub async fn reload(&self) -> bool {
        let (reply, applied) = oneshot::channel();
        if self.requests.send(reply).await.is_err() {
            return false;
        }
        applied.await.unwrap_or(false)
    }

    /// Stop the watcher and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Reload watcher ended abnormally");
        }
    }
}

impl Drop for ReloadHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T: Bind + Send + 'static> Strata<T> {
    /// Start reloading on SIGHUP and on [`ReloadHandle::reload`].
    ///
    /// Must be called from within a Tokio runtime. Fails only if the signal
    /// handler cannot be installed.
    pub fn watch(&self) -> io::Result<ReloadHandle> {
        let hangup = Hangup::new()?;
        let (requests, rx) = mpsc::channel(REQUEST_CAPACITY);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(self.clone(), hangup, rx, cancel.clone()));
        debug!("Reload watcher started");

        Ok(ReloadHandle {
            requests,
            cancel,
            task: Some(task),
        })
    }
}

async fn run<T: Bind + Send + 'static>(
    strata: Strata<T>,
    mut hangup: Hangup,
    mut requests: mpsc::Receiver<oneshot::Sender<bool>>,
    cancel: CancellationToken,
) {
    loop {
        let reply = tokio::select! {
            () = cancel.cancelled() => break,
            Some(()) = hangup.recv() => {
                info!("Hang-up received, reloading configuration");
                None
            }
            request = requests.recv() => match request {
                Some(reply) => Some(reply),
                None => break,
            },
        };

        let worker = strata.clone();
        let applied = match tokio::task::spawn_blocking(move || worker.reload()).await {
            Ok(applied) => applied,
            Err(e) => {
                warn!(error = %e, "Reload failed");
                false
            }
        };

        if let Some(reply) = reply {
            let _ = reply.send(applied);
        }
    }
    debug!("Reload watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{MemoryFs, ServerConfig};
    use crate::registry::Setting;
    use crate::types::Outcome;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    // Every watcher listens for SIGHUP, so a hang-up sent by one test would
    // reload the others. Watcher tests run one at a time.
    static WATCHERS: Mutex<()> = Mutex::new(());

    fn exclusive() -> MutexGuard<'static, ()> {
        WATCHERS.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loaded(fs: &MemoryFs, args: &[&str]) -> Strata<ServerConfig> {
        let strata = Strata::builder()
            .setting(Setting::new("port").alias("-p"))
            .file("/app.json")
            .args(args.iter().copied())
            .env_vars(Vec::<(String, String)>::new())
            .filesystem(fs.clone())
            .build(ServerConfig::default())
            .unwrap();
        assert_eq!(strata.load(), Outcome::Loaded);
        strata
    }

    #[tokio::test]
    async fn explicit_reload_applies_newer_file() {
        let _guard = exclusive();
        let fs = MemoryFs::new();
        fs.put("/app.json", r#"{"host": "one"}"#, 10);
        let strata = loaded(&fs, &[]);
        let handle = strata.watch().unwrap();

        assert!(!handle.reload().await);

        fs.put("/app.json", r#"{"host": "two"}"#, 11);
        assert!(handle.reload().await);
        assert_eq!(strata.read(|c| c.host.clone()), "two");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn cli_layer_keeps_precedence_across_reloads() {
        let _guard = exclusive();
        let fs = MemoryFs::new();
        fs.put("/app.json", r#"{"port": 1}"#, 10);
        let strata = loaded(&fs, &["-p", "9"]);
        let handle = strata.watch().unwrap();

        fs.put("/app.json", r#"{"port": 2, "debug": true}"#, 11);
        assert!(handle.reload().await);
        strata.read(|c| {
            assert_eq!(c.port, 9);
            assert!(c.debug);
        });

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn queued_requests_run_in_order() {
        let _guard = exclusive();
        let fs = MemoryFs::new();
        fs.put("/app.json", r#"{"host": "a"}"#, 10);
        let strata = loaded(&fs, &[]);
        let handle = strata.watch().unwrap();

        fs.put("/app.json", r#"{"host": "b"}"#, 11);
        let (first, second) = tokio::join!(handle.reload(), handle.reload());
        assert!(first ^ second);
        assert_eq!(strata.read(|c| c.host.clone()), "b");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_file_keeps_previous_state() {
        let _guard = exclusive();
        let fs = MemoryFs::new();
        fs.put("/app.json", r#"{"host": "good"}"#, 10);
        let strata = loaded(&fs, &[]);
        let handle = strata.watch().unwrap();

        fs.put("/app.json", "{ broken", 11);
        assert!(!handle.reload().await);
        assert_eq!(strata.read(|c| c.host.clone()), "good");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn stopped_watcher_refuses_requests() {
        let _guard = exclusive();
        let fs = MemoryFs::new();
        fs.put("/app.json", "{}", 10);
        let strata = loaded(&fs, &[]);
        let mut handle = strata.watch().unwrap();

        handle.cancel.cancel();
        handle.task.take().unwrap().await.unwrap();

        fs.put("/app.json", r#"{"host": "late"}"#, 11);
        assert!(!handle.reload().await);
        assert_eq!(strata.read(|c| c.host.clone()), "localhost");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hangup_signal_reloads() {
        let _guard = exclusive();
        let fs = MemoryFs::new();
        fs.put("/app.json", r#"{"host": "before"}"#, 10);
        let strata = loaded(&fs, &["-p", "9"]);
        let handle = strata.watch().unwrap();

        fs.put("/app.json", r#"{"host": "after", "port": 1}"#, 11);
        let status = std::process::Command::new("kill")
            .args(["-HUP", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let mut host = String::new();
        for _ in 0..200 {
            host = strata.read(|c| c.host.clone());
            if host == "after" {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(host, "after");
        assert_eq!(strata.read(|c| c.port), 9);

        // The signal's reload consumed the change.
        assert!(!handle.reload().await);
        handle.shutdown().await;
    }
}
