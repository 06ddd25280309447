//! Component E — the demand-driven, thread-parallel input loader. Starts
//! from the entry directory's build file and, as each file's declarations
//! reference labels in directories not yet visited, enqueues those
//! directories' build files for the same toolchain, until the queue is
//! empty and no worker is still processing.
//!
//! Built on [`crate::util::job_pool::JobPool`] the same way the teacher's
//! own job handling sizes itself to `available_parallelism` by default —
//! the difference being this pool only ever runs in-process closures, never
//! supervises child processes.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use quarry_platform::{Label, SourceDir, SourceFile};

use crate::core::scope::Scope;
use crate::core::settings::{BuildSettings, Settings};
use crate::evaluator::Evaluator;
use crate::util::errors::ErrorSink;
use crate::util::job_pool::JobPool;
use crate::util::errors::QuarryResult;

/// Extension point for a front end that parses something other than a
/// conventional build file — mirrors `original_source/src/gn/input_alternate_loader.h`.
/// Quarry ships no implementer; this only exists so an embedder can plug one
/// in without forking the loader.
pub trait AlternateLoader: Send + Sync {
    /// Called when the conventional build file at `file` can't be read from
    /// disk. Returning `Some(source)` substitutes `source` as if it had been
    /// read normally; `None` falls through to the usual "file not found"
    /// error.
    fn try_load(&self, file: &SourceFile) -> Option<String>;
}

struct Inner {
    evaluator: Arc<Evaluator>,
    build_settings: Arc<BuildSettings>,
    default_toolchain: Arc<Label>,
    build_file_name: String,
    alternate: Option<Arc<dyn AlternateLoader>>,
    errors: Arc<ErrorSink>,
    queued: Mutex<HashSet<(SourceFile, Label)>>,
    outstanding: (Mutex<usize>, Condvar),
    aborted: AtomicBool,
    pool: JobPool,
}

/// Drives the loader over one build: enqueue the entry file, run until the
/// queue drains, then hand off to the resolver's final missing-item/cycle
/// sweep.
pub struct Loader {
    inner: Arc<Inner>,
}

impl Loader {
    pub fn new(
        evaluator: Arc<Evaluator>,
        build_settings: Arc<BuildSettings>,
        default_toolchain: Arc<Label>,
        jobs: usize,
        build_file_name: impl Into<String>,
        alternate: Option<Arc<dyn AlternateLoader>>,
    ) -> Loader {
        Loader {
            inner: Arc::new(Inner {
                evaluator,
                build_settings,
                default_toolchain,
                build_file_name: build_file_name.into(),
                alternate,
                errors: Arc::new(ErrorSink::new()),
                queued: Mutex::new(HashSet::new()),
                outstanding: (Mutex::new(0), Condvar::new()),
                aborted: AtomicBool::new(false),
                pool: JobPool::new(jobs),
            }),
        }
    }

    /// Loads every build file transitively reachable from `entry_dir`'s
    /// build file, blocking until the loader goes idle, then runs the
    /// resolver's final sweep.
    #[tracing::instrument(skip(self), fields(workers = self.inner.pool.worker_count()))]
    pub fn run(&self, entry_dir: SourceDir) -> QuarryResult<()> {
        let entry_file = entry_dir.join_file(&self.inner.build_file_name);
        enqueue(&self.inner, entry_file, Arc::clone(&self.inner.default_toolchain));
        wait_idle(&self.inner);

        let messages = self.inner.errors.snapshot_messages();
        if !messages.is_empty() {
            anyhow::bail!("{} error(s) while loading build files:\n{}", messages.len(), messages.join("\n"));
        }

        tracing::debug!("loader idle, handing off to resolver's final sweep");
        self.inner.evaluator.resolver.check_complete()
    }

    pub fn worker_count(&self) -> usize {
        self.inner.pool.worker_count()
    }
}

fn wait_idle(inner: &Arc<Inner>) {
    let (lock, cvar) = &inner.outstanding;
    let mut count = lock.lock().unwrap();
    while *count > 0 {
        count = cvar.wait(count).unwrap();
    }
}

/// Enqueues `(file, toolchain)` unless it is already queued or the loader
/// has aborted. Runs the load on a worker thread and, on success, scans the
/// registry for newly-referenced labels whose declaring file hasn't been
/// queued yet — step 7 of the input-loader algorithm ("deps referencing
/// labels whose file has not yet been loaded enqueue the declaring files").
fn enqueue(inner: &Arc<Inner>, file: SourceFile, toolchain: Arc<Label>) {
    if inner.aborted.load(Ordering::SeqCst) {
        return;
    }
    {
        let mut queued = inner.queued.lock().unwrap();
        if !queued.insert((file, toolchain.as_ref().clone())) {
            return;
        }
    }
    tracing::trace!(%file, toolchain = %toolchain, "enqueuing build file");
    {
        let mut count = inner.outstanding.0.lock().unwrap();
        *count += 1;
    }

    let inner_for_job = Arc::clone(inner);
    inner.pool.execute(move || {
        if !inner_for_job.aborted.load(Ordering::SeqCst) {
            match load_one(&inner_for_job, file, &toolchain) {
                Ok(()) => discover_and_enqueue(&inner_for_job),
                Err(e) => {
                    inner_for_job.errors.push(e);
                    inner_for_job.aborted.store(true, Ordering::SeqCst);
                }
            }
        }
        let mut count = inner_for_job.outstanding.0.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            inner_for_job.outstanding.1.notify_all();
        }
    });
}

#[tracing::instrument(skip(inner, toolchain))]
fn load_one(inner: &Arc<Inner>, file: SourceFile, toolchain: &Arc<Label>) -> QuarryResult<()> {
    let physical = inner.evaluator.to_physical_file(&file);
    let source = match std::fs::read_to_string(&physical) {
        Ok(s) => s,
        Err(read_err) => match inner.alternate.as_ref().and_then(|alt| alt.try_load(&file)) {
            Some(s) => s,
            None => anyhow::bail!("couldn't read {}: {}", file, read_err),
        },
    };

    let settings = Rc::new(Settings::new(
        Arc::clone(&inner.build_settings),
        Arc::clone(toolchain),
        Arc::clone(&inner.default_toolchain),
    ));
    let scope = Rc::new(RefCell::new(Scope::root(file.dir(), settings)));
    inner.evaluator.eval_file(file, &source, &scope)?;
    // Each loaded build file's own top-level scope exits for good here, same
    // as a target/config/pool/toolchain declaration block — unlike a `.gni`
    // import's sibling scope (merged into its importer instead of checked).
    inner.evaluator.report_unused(file, &scope)
}

/// Walks every registry record with no item yet and enqueues its directory's
/// build file for whichever toolchain it was referenced under. Re-running
/// this after every load is idempotent — `enqueue`'s `queued` set is the
/// only thing that decides whether a job is actually spawned.
fn discover_and_enqueue(inner: &Arc<Inner>) {
    for record in inner.evaluator.registry.all_records() {
        if record.item().is_some() {
            continue;
        }
        let label = &record.label;
        let toolchain = match label.toolchain() {
            Some(t) => Arc::new(t.clone()),
            None => Arc::clone(&inner.default_toolchain),
        };
        let file = label.dir().join_file(&inner.build_file_name);
        enqueue(inner, file, toolchain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registry;
    use crate::core::resolver::Resolver;
    use std::path::PathBuf;

    fn write(dir: &std::path::Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_a_dependency_declared_in_another_directory() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "BUILD.quarry", "group(\"foo\") {\n  deps = [ \"//bar:bar\" ]\n}\n");
        write(tmp.path(), "bar/BUILD.quarry", "group(\"bar\") {\n}\n");

        let registry = Arc::new(Registry::new());
        let resolver = Arc::new(Resolver::new(Arc::clone(&registry)));
        let evaluator = Arc::new(Evaluator::new(registry, resolver, PathBuf::from(tmp.path())));
        let build_settings = Arc::new(BuildSettings::new(SourceDir::root(), SourceDir::new("//out/Debug/")));
        let default_toolchain = Arc::new(Label::new(SourceDir::new("//toolchain/"), "default", None));

        let loader = Loader::new(evaluator, build_settings, default_toolchain, 2, "BUILD.quarry", None);
        loader.run(SourceDir::root()).expect("load should succeed");

        let bar = Label::new(SourceDir::new("//bar/"), "bar", Some(Arc::new(Label::new(SourceDir::new("//toolchain/"), "default", None))));
        let record = loader.inner.evaluator.registry.get(&bar).expect("bar should have been discovered");
        assert!(record.item().is_some());
    }

    #[test]
    fn reports_a_missing_dependency() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "BUILD.quarry", "group(\"foo\") {\n  deps = [ \"//missing:thing\" ]\n}\n");

        let registry = Arc::new(Registry::new());
        let resolver = Arc::new(Resolver::new(Arc::clone(&registry)));
        let evaluator = Arc::new(Evaluator::new(registry, resolver, PathBuf::from(tmp.path())));
        let build_settings = Arc::new(BuildSettings::new(SourceDir::root(), SourceDir::new("//out/Debug/")));
        let default_toolchain = Arc::new(Label::new(SourceDir::new("//toolchain/"), "default", None));

        let loader = Loader::new(evaluator, build_settings, default_toolchain, 2, "BUILD.quarry", None);
        let result = loader.run(SourceDir::root());
        assert!(result.is_err());
    }
}
