// Shutter receiver: radio poll loop and optional directory watch feeding the capture pipeline.

mod config;
mod drive;
mod radio;
mod watch;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use shutter_core::{CapturePipeline, Radio, ReceiveStats, Receiver, StorageSink, UploadSink};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    for arg in std::env::args().skip(1) {
        if arg == "--version" || arg == "-V" {
            println!("shutter-receiver {}", VERSION);
            return Ok(());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = config::load();

    let storage =
        drive::DriveClient::from_credentials_file(&cfg.upload.credentials_path, &cfg.upload.api_base)
            .context("failed to load storage credentials")?;
    let sink = StorageSink::new(storage, cfg.upload.parent_folder_id.clone());
    let pipeline = Arc::new(CapturePipeline::new(cfg.pipeline_config(), sink));

    let radio = radio::BridgedRadio::open(&cfg.radio_port, cfg.radio_baud)
        .with_context(|| format!("failed to open radio on {}", cfg.radio_port))?;
    let receiver = Receiver::new(radio, pipeline.clone()).with_poll_interval(cfg.poll_interval());

    let rt = tokio::runtime::Runtime::new()?;
    let stats = rt.block_on(serve(receiver, pipeline, &cfg.watch, &cfg.capture_dir))?;
    tracing::info!(payloads = stats.payloads, bytes = stats.bytes, "receive loop finished");

    tracing::info!("program stopped");
    Ok(())
}

/// Register signal handlers and start the watch, then run the receive loop until a
/// signal or a radio error. Anything that can fail at startup happens before the loop
/// is spawned, so an early error drops the receiver (and its radio) right here.
async fn serve<R, S>(
    receiver: Receiver<R, S>,
    pipeline: Arc<CapturePipeline<S>>,
    watch_cfg: &config::WatchConfig,
    capture_dir: &Path,
) -> anyhow::Result<ReceiveStats>
where
    R: Radio + Send + 'static,
    S: UploadSink + 'static,
{
    let signal = shutdown_signal().context("failed to register signal handlers")?;

    let _watcher = if watch_cfg.enabled {
        if watch_cfg.dir == capture_dir {
            tracing::warn!(
                dir = %watch_cfg.dir.display(),
                "watch dir is the capture dir; received images will upload twice"
            );
        }
        let (watcher, created) =
            watch::watch_dir(&watch_cfg.dir).context("failed to start directory watch")?;
        tokio::spawn(dispatch_created(created, pipeline));
        Some(watcher)
    } else {
        None
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let rx_shutdown = shutdown.clone();
    let mut receive_task = tokio::task::spawn_blocking(move || receiver.run(&rx_shutdown));

    tokio::select! {
        _ = signal => {}
        joined = &mut receive_task => {
            return joined?.context("receive loop aborted");
        }
    }
    tracing::info!("shutdown signal received");
    shutdown.store(true, Ordering::Relaxed);
    receive_task.await?.context("receive loop aborted")
}

/// Hand each created path to the pipeline on a blocking thread. Returns the number of
/// handlers that panicked once the channel closes.
async fn dispatch_created<S: UploadSink + 'static>(
    mut created: mpsc::UnboundedReceiver<PathBuf>,
    pipeline: Arc<CapturePipeline<S>>,
) -> usize {
    let mut failed = 0;
    while let Some(path) = created.recv().await {
        let pipeline = pipeline.clone();
        let shown = path.display().to_string();
        if let Err(e) = tokio::task::spawn_blocking(move || pipeline.on_file_created(&path)).await {
            tracing::error!(path = %shown, error = %e, "watch handler failed");
            failed += 1;
        }
    }
    failed
}

/// Register SIGINT and SIGTERM now; the returned future resolves on either.
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shutter_core::{PipelineConfig, RemoteId, UploadError};
    use std::io;
    use std::sync::Mutex;

    struct FakeRadio {
        fail: bool,
        released: Arc<AtomicBool>,
    }

    impl Radio for FakeRadio {
        fn available(&mut self) -> io::Result<bool> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "bridge unplugged"));
            }
            Ok(false)
        }

        fn dynamic_payload_size(&mut self) -> io::Result<usize> {
            Ok(0)
        }

        fn read_payload(&mut self, _len: usize) -> io::Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    impl Drop for FakeRadio {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Sink {
        paths: Mutex<Vec<PathBuf>>,
    }

    impl UploadSink for Sink {
        fn upload(&self, path: &Path) -> Result<RemoteId, UploadError> {
            if path.file_name().is_some_and(|n| n == "boom.jpg") {
                panic!("storage client crashed");
            }
            self.paths.lock().unwrap().push(path.to_path_buf());
            Ok(RemoteId("id".into()))
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("shutter-rx-main-{}-{}", name, std::process::id()))
    }

    fn setup(
        dir: &Path,
        fail: bool,
    ) -> (
        Receiver<FakeRadio, Arc<Sink>>,
        Arc<CapturePipeline<Arc<Sink>>>,
        Arc<AtomicBool>,
    ) {
        let released = Arc::new(AtomicBool::new(false));
        let pipeline = Arc::new(CapturePipeline::new(
            PipelineConfig {
                capture_dir: dir.join("images"),
                ..PipelineConfig::default()
            },
            Arc::new(Sink::default()),
        ));
        let radio = FakeRadio {
            fail,
            released: released.clone(),
        };
        (Receiver::new(radio, pipeline.clone()), pipeline, released)
    }

    #[tokio::test]
    async fn watch_failure_stops_before_receive_loop_and_releases_radio() {
        let dir = temp_dir("badwatch");
        std::fs::create_dir_all(&dir).unwrap();
        let not_a_dir = dir.join("notadir");
        std::fs::write(&not_a_dir, b"file").unwrap();
        let (receiver, pipeline, released) = setup(&dir, false);
        let watch_cfg = config::WatchConfig {
            enabled: true,
            dir: not_a_dir.join("sub"),
            ..config::WatchConfig::default()
        };

        let err = serve(receiver, pipeline, &watch_cfg, &dir.join("images"))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to start directory watch"));
        assert!(released.load(Ordering::SeqCst));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn radio_failure_ends_serve_with_error() {
        let dir = temp_dir("radiofail");
        let (receiver, pipeline, released) = setup(&dir, true);

        let err = serve(receiver, pipeline, &config::WatchConfig::default(), &dir)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("receive loop aborted"));
        assert!(released.load(Ordering::SeqCst));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn panicking_watch_handler_is_reported_and_loop_continues() {
        let dir = temp_dir("panic");
        let sink = Arc::new(Sink::default());
        let pipeline = Arc::new(CapturePipeline::new(
            PipelineConfig {
                capture_dir: dir.clone(),
                ..PipelineConfig::default()
            },
            sink.clone(),
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(dir.join("boom.jpg")).unwrap();
        tx.send(dir.join("fine.jpg")).unwrap();
        drop(tx);

        assert_eq!(dispatch_created(rx, pipeline).await, 1);
        assert_eq!(*sink.paths.lock().unwrap(), vec![dir.join("fine.jpg")]);
    }
}
