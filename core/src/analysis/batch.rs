use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::ingest::{RawRun, VehicleConstants};
use crate::prelude::DecodeResult;
use crate::telemetry::LogManager;

/// A file that could not be loaded, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchError {
    pub path: PathBuf,
    pub message: String,
}

/// Loaded runs and per-file failures, both in caller order.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub runs: Vec<RawRun>,
    pub errors: Vec<BatchError>,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

fn worker_limit() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Decode every file on the blocking pool, at most one task per core at a
/// time. Completion order does not matter: results are slotted back by input
/// position, so a failing file never disturbs the order of its neighbours.
pub async fn load_batch(paths: &[PathBuf], constants: &VehicleConstants) -> BatchResult {
    let constants = *constants;
    load_batch_with(paths, worker_limit(), move |path| {
        RawRun::load(path, &constants)
    })
    .await
}

/// [`load_batch`] with an explicit concurrency limit and loader.
pub async fn load_batch_with<F>(paths: &[PathBuf], limit: usize, loader: F) -> BatchResult
where
    F: Fn(&Path) -> DecodeResult<RawRun> + Send + Sync + 'static,
{
    let logger = LogManager::new("batch");
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let loader = Arc::new(loader);
    let mut tasks = JoinSet::new();

    for (index, path) in paths.iter().cloned().enumerate() {
        let permits = Arc::clone(&permits);
        let loader = Arc::clone(&loader);
        tasks.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(permit) => tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    loader(&path).map_err(|err| err.to_string())
                })
                .await
                .unwrap_or_else(|err| Err(format!("decode task failed: {}", err))),
                Err(_) => Err("batch limiter closed".to_string()),
            };
            (index, outcome)
        });
    }

    let mut slots: Vec<Option<Result<RawRun, String>>> = (0..paths.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(err) => logger.warn(&format!("batch task aborted: {}", err)),
        }
    }

    let mut result = BatchResult::default();
    for (path, slot) in paths.iter().zip(slots) {
        match slot.unwrap_or_else(|| Err("task aborted".to_string())) {
            Ok(run) => result.runs.push(run),
            Err(message) => {
                logger.warn(&format!("{}: {}", path.display(), message));
                result.errors.push(BatchError {
                    path: path.clone(),
                    message,
                });
            }
        }
    }

    logger.record(&format!(
        "loaded {} of {} run files",
        result.runs.len(),
        paths.len()
    ));
    result
}

/// [`load_batch`] for callers without a runtime.
pub fn load_batch_blocking(
    paths: &[PathBuf],
    constants: &VehicleConstants,
) -> DecodeResult<BatchResult> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_limit())
        .build()?;
    Ok(runtime.block_on(load_batch(paths, constants)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Condvar, Mutex};
    use std::time::Duration;

    fn write_run(dir: &Path, name: &str, groups: usize) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "f1,f2").unwrap();
        for i in 0..groups * 10 {
            writeln!(file, "{},{}", i % 4, i % 2).unwrap();
        }
        path
    }

    #[tokio::test]
    async fn preserves_order_around_a_failing_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_run(dir.path(), "a.csv", 30);
        let broken = dir.path().join("b.csv");
        std::fs::write(&broken, "speed,rpm\n1,2\n").unwrap();
        let third = write_run(dir.path(), "c.csv", 12);
        let missing = dir.path().join("d.csv");
        let fifth = write_run(dir.path(), "e.csv", 3);

        let paths = vec![first, broken.clone(), third, missing.clone(), fifth];
        let result = load_batch(&paths, &VehicleConstants::default()).await;

        let names: Vec<&str> = result.runs.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["a.csv", "c.csv", "e.csv"]);
        assert_eq!(result.runs[0].len(), 30);
        assert_eq!(result.runs[1].len(), 12);

        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].path, broken);
        assert!(result.errors[0].message.contains("f1"));
        assert_eq!(result.errors[1].path, missing);
        assert!(!result.is_complete());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn later_files_finishing_first_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let slow = write_run(dir.path(), "a.csv", 20);
        let broken = dir.path().join("b.csv");
        std::fs::write(&broken, "speed,rpm\n1,2\n").unwrap();
        let fast = write_run(dir.path(), "c.csv", 5);

        // a.csv is held until c.csv has been decoded.
        let gate = Arc::new((Mutex::new(false), Condvar::new()));
        let finished = Arc::new(Mutex::new(Vec::new()));
        let loader = {
            let gate = Arc::clone(&gate);
            let finished = Arc::clone(&finished);
            move |path: &Path| {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                let (open, signal) = &*gate;
                if name == "a.csv" {
                    let guard = open.lock().unwrap();
                    let (guard, timeout) = signal
                        .wait_timeout_while(guard, Duration::from_secs(10), |open| !*open)
                        .unwrap();
                    assert!(*guard && !timeout.timed_out(), "a.csv was never released");
                }
                let loaded = RawRun::load(path, &VehicleConstants::default());
                finished.lock().unwrap().push(name.clone());
                if name == "c.csv" {
                    *open.lock().unwrap() = true;
                    signal.notify_all();
                }
                loaded
            }
        };

        let paths = vec![slow, broken.clone(), fast];
        let result = load_batch_with(&paths, 4, loader).await;

        let order = finished.lock().unwrap().clone();
        let position = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(position("c.csv") < position("a.csv"), "{:?}", order);

        let names: Vec<&str> = result.runs.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["a.csv", "c.csv"]);
        assert_eq!(result.runs[0].len(), 20);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, broken);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn many_files_all_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..16)
            .map(|i| write_run(dir.path(), &format!("run_{:02}.csv", i), i + 1))
            .collect();
        let result = load_batch(&paths, &VehicleConstants::default()).await;
        assert!(result.is_complete());
        for (i, run) in result.runs.iter().enumerate() {
            assert_eq!(run.name(), format!("run_{:02}.csv", i));
            assert_eq!(run.len(), i + 1);
        }
    }

    #[test]
    fn blocking_wrapper_builds_its_own_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![write_run(dir.path(), "solo.csv", 4)];
        let result = load_batch_blocking(&paths, &VehicleConstants::default()).unwrap();
        assert_eq!(result.runs.len(), 1);
        assert!(load_batch_blocking(&[], &VehicleConstants::default())
            .unwrap()
            .runs
            .is_empty());
    }
}
