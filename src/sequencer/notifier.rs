// Beat notifier - Fires on_beat callbacks when each beat becomes audible
//
// Notifications are queued at schedule time with the delay until the beat's
// target time and fired by a single worker thread in FIFO order, so a later
// beat never reports before an earlier one.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error};

use super::params::BeatCallback;

struct PendingBeat {
    due: Instant,
    beat: u64,
    callback: BeatCallback,
    epoch: u64,
}

enum Message {
    Beat(PendingBeat),
    /// Sent after an epoch bump so a sleeping worker re-checks its queue
    Cancelled,
    Shutdown,
}

/// Cloneable submission side of the notifier
#[derive(Clone)]
pub struct NotifierHandle {
    tx: Sender<Message>,
    epoch: Arc<AtomicU64>,
}

impl NotifierHandle {
    /// Call `callback(beat)` once `delay` has elapsed
    pub fn notify_after(&self, beat: u64, delay: Duration, callback: BeatCallback) {
        let pending = PendingBeat {
            due: Instant::now() + delay,
            beat,
            callback,
            epoch: self.epoch.load(Ordering::SeqCst),
        };
        if self.tx.send(Message::Beat(pending)).is_err() {
            debug!("Beat notifier stopped, dropping beat {}", beat);
        }
    }

    /// Discard every notification queued so far, including one the worker
    /// is currently waiting on
    pub fn cancel_pending(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(Message::Cancelled);
    }
}

pub struct BeatNotifier {
    handle: NotifierHandle,
    worker: Option<JoinHandle<()>>,
}

impl BeatNotifier {
    pub fn spawn() -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let epoch = Arc::new(AtomicU64::new(0));

        let worker_epoch = Arc::clone(&epoch);
        let worker = thread::Builder::new()
            .name("beat-notifier".to_string())
            .spawn(move || run_worker(rx, worker_epoch))?;

        Ok(Self {
            handle: NotifierHandle { tx, epoch },
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> NotifierHandle {
        self.handle.clone()
    }
}

impl Drop for BeatNotifier {
    fn drop(&mut self) {
        let _ = self.handle.tx.send(Message::Shutdown);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("Beat notifier thread panicked");
        }
    }
}

fn run_worker(rx: Receiver<Message>, epoch: Arc<AtomicU64>) {
    let mut queue: VecDeque<PendingBeat> = VecDeque::new();
    let mut shutting_down = false;

    loop {
        let current = epoch.load(Ordering::SeqCst);
        queue.retain(|pending| pending.epoch == current);

        let Some(head) = queue.front() else {
            if shutting_down {
                break;
            }
            match rx.recv() {
                Ok(message) => accept(message, &mut queue, &mut shutting_down),
                Err(_) => break,
            }
            continue;
        };

        let now = Instant::now();
        if head.due > now {
            let wait = head.due - now;
            if shutting_down {
                thread::sleep(wait);
            } else {
                match rx.recv_timeout(wait) {
                    Ok(message) => accept(message, &mut queue, &mut shutting_down),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => shutting_down = true,
                }
            }
            continue;
        }

        if let Some(pending) = queue.pop_front() {
            fire(pending);
        }
    }
    debug!("Beat notifier stopped");
}

fn accept(message: Message, queue: &mut VecDeque<PendingBeat>, shutting_down: &mut bool) {
    match message {
        Message::Beat(pending) => queue.push_back(pending),
        Message::Cancelled => {}
        // Already-queued beats still fire before the worker exits
        Message::Shutdown => *shutting_down = true,
    }
}

fn fire(pending: PendingBeat) {
    let callback = &pending.callback;
    let beat = pending.beat;
    if panic::catch_unwind(AssertUnwindSafe(|| callback(beat))).is_err() {
        error!("on_beat callback panicked on beat {}", beat);
    }
}
