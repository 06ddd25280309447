//! A fixed-size worker pool for the input loader.
//!
//! The loader's work units are independent `(file, toolchain)` pairs (see
//! [`crate::loader`]), so unlike cargo's job handling — which supervises
//! external `rustc` child processes and cares about process groups — this
//! pool only ever runs closures in-process. Sized like cargo's own
//! `BuildConfig::jobs` default: one worker per available core unless
//! overridden.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

/// A pool of `size` worker threads pulling closures off a shared queue.
pub struct JobPool {
    workers: Vec<thread::JoinHandle<()>>,
    sender: mpsc::Sender<Message>,
}

impl JobPool {
    /// `size` is clamped to at least 1; `0` or unspecified means "one worker
    /// per available core", mirroring cargo's `-j` default.
    pub fn new(size: usize) -> JobPool {
        let size = if size == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            size
        };

        let (sender, receiver) = mpsc::channel::<Message>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("quarry-loader-{}", id))
                    .spawn(move || loop {
                        let message = receiver.lock().unwrap().recv();
                        match message {
                            Ok(Message::Run(job)) => job(),
                            Ok(Message::Shutdown) | Err(_) => break,
                        }
                    })
                    .expect("failed to spawn loader worker thread")
            })
            .collect();

        JobPool { workers, sender }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueues `job`. Panics if the pool has already been shut down.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(Message::Run(Box::new(job)))
            .expect("job pool workers have already shut down");
    }
}

impl Drop for JobPool {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.sender.send(Message::Shutdown);
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_every_submitted_job() {
        let pool = JobPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }
}
