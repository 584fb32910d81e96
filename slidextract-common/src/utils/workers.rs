use std::{
    any::Any,
    fmt, io,
    num::NonZeroUsize,
    sync::{mpsc, Arc, Mutex},
    thread,
};

use crate::bin_common::termination::Cookie;

/// A fixed number of named threads consuming a bounded queue of tasks.
///
/// Tasks are handed out in submission order, but nothing is said about the order they
/// finish in. A task whose handler returns an error is logged and counted, it does not
/// affect any other task. [`WorkerPool::submit`] blocks while the queue is full.
/// [`WorkerPool::close`] tells the workers that no more tasks are coming, and
/// [`WorkerPool::join`] waits for all of them to drain the queue and exit.
///
/// Before each task the workers look at the cookie. If it has been tripped, the rest of
/// the queue is only counted as skipped. Timeouts of a single task is the handler's
/// business.
pub struct WorkerPool<T> {
    sender: Option<mpsc::SyncSender<T>>,
    handles: Vec<(String, thread::JoinHandle<Tally>)>,
}

/// What a worker did with the tasks it received.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct CaughtPanic(pub Box<dyn Any + Send + 'static>);

pub struct FinishedWorker {
    pub name: String,
    pub result: Result<Tally, CaughtPanic>,
}

#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    #[error("the pool has already been closed")]
    Closed,
    #[error("every worker has exited, the task could not be queued")]
    Disconnected,
    #[error("failed to spawn worker thread")]
    Spawn(#[source] io::Error),
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawns `workers` threads named `{name}00`, `{name}01`, and so on. The queue holds
    /// as many tasks as there are workers.
    pub fn spawn<F, E>(
        name: &str,
        workers: NonZeroUsize,
        cookie: Cookie,
        handler: F,
    ) -> Result<Self, PoolError>
    where
        F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
        E: fmt::Display + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(workers.get());
        let receiver = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);

        let mut handles = Vec::with_capacity(workers.get());
        for index in 0..workers.get() {
            let name = format!("{name}{index:>02}");
            let receiver = Arc::clone(&receiver);
            let handler = Arc::clone(&handler);
            let cookie = cookie.clone();
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || work(&receiver, handler.as_ref(), &cookie))
                .map_err(PoolError::Spawn)?;
            handles.push((name, handle));
        }

        Ok(Self {
            sender: Some(sender),
            handles,
        })
    }

    pub fn submit(&self, task: T) -> Result<(), PoolError> {
        self.sender
            .as_ref()
            .ok_or(PoolError::Closed)?
            .send(task)
            .map_err(|_| PoolError::Disconnected)
    }

    pub fn close(&mut self) {
        self.sender.take();
    }

    /// Closes the queue, if not already closed, and waits for every worker to exit.
    pub fn join(mut self) -> Vec<FinishedWorker> {
        self.close();
        std::mem::take(&mut self.handles)
            .into_iter()
            .map(|(name, handle)| FinishedWorker {
                name,
                result: handle.join().map_err(CaughtPanic),
            })
            .collect()
    }

    pub fn num_workers(&self) -> usize {
        self.handles.len()
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.sender.take();
        for (name, handle) in self.handles.drain(..) {
            if let Err(panic) = handle.join() {
                log::error!("Worker '{name}' panicked with: {}", CaughtPanic(panic));
            }
        }
    }
}

fn work<T, F, E>(
    receiver: &Mutex<mpsc::Receiver<T>>,
    handler: &F,
    cookie: &Cookie,
) -> Tally
where
    F: Fn(T) -> Result<(), E>,
    E: fmt::Display,
{
    let mut tally = Tally::default();
    loop {
        let task = match receiver.lock() {
            Ok(receiver) => receiver.recv(),
            Err(_) => {
                log::error!("Another worker panicked while holding the queue");
                break;
            }
        };

        // NOTE: an error means the queue is both closed and empty
        let Ok(task) = task else { break };

        if cookie.is_terminating() {
            tally.skipped += 1;
            continue;
        }

        match handler(task) {
            Ok(()) => tally.completed += 1,
            Err(e) => {
                log::warn!("Task failed: {e}");
                tally.failed += 1;
            }
        }
    }
    tally
}

impl Tally {
    pub fn consumed(&self) -> usize {
        self.completed + self.failed + self.skipped
    }
}

impl std::ops::Add for Tally {
    type Output = Tally;

    fn add(self, rhs: Self) -> Self::Output {
        Tally {
            completed: self.completed + rhs.completed,
            failed: self.failed + rhs.failed,
            skipped: self.skipped + rhs.skipped,
        }
    }
}

impl std::iter::Sum for Tally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Tally::default(), |acc, t| acc + t)
    }
}

impl fmt::Display for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let panic = &self.0;
        let string = panic
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| {
                format!("non-string panic message: {:?}", panic.type_id())
            });
        write!(f, "{string}")
    }
}

impl fmt::Debug for CaughtPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaughtPanic({self})")
    }
}
