//! Named, cancellable session timers
//!
//! Each timer is a tokio task that sleeps and then posts a fire message into
//! the session queue. Arming a name aborts the previous task under that name.
//! Timers hold a weak sender, so pending timers never keep a session alive.
//! A fire that was already queued when its timer got superseded carries a
//! stale generation and is rejected by [`Timers::take_fired`].

use super::session::Input;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Finalize or abandon the capture in flight
    CommandTimeout,
    /// Force a restart when the engine has gone quiet
    Inactivity,
    /// Report remaining capture time
    Countdown,
    /// Delayed engine restart (after an end or with backoff)
    Restart,
    /// Retry a `start()` that arrived while stopping
    StartRetry,
    /// Clear the stop guard
    StopDebounce,
}

struct Slot {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct Timers {
    tx: mpsc::WeakUnboundedSender<Input>,
    slots: HashMap<TimerKind, Slot>,
    next_generation: u64,
}

impl Timers {
    pub fn new(tx: mpsc::WeakUnboundedSender<Input>) -> Self {
        Self {
            tx,
            slots: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Arm `kind` to fire after `delay`, cancelling any armed instance first
    pub fn arm(&mut self, kind: TimerKind, delay: Duration) {
        self.cancel(kind);

        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Session gone means nobody is left to notify
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Input::Timer { kind, generation });
            }
        });

        self.slots.insert(kind, Slot { generation, handle });
    }

    /// Cancel `kind`; returns whether it was armed
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.slots.remove(&kind) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, slot) in self.slots.drain() {
            slot.handle.abort();
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots.contains_key(&kind)
    }

    /// Accept a fire message if it belongs to the currently armed instance
    pub fn take_fired(&mut self, kind: TimerKind, generation: u64) -> bool {
        match self.slots.get(&kind) {
            Some(slot) if slot.generation == generation => {
                self.slots.remove(&kind);
                true
            }
            _ => false,
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
