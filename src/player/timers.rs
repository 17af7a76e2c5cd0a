use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at, sleep};
use tokio_util::task::AbortOnDropHandle;
use tracing::trace;

use super::events::SessionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Progress,
    ControlsHide,
    PauseOverlay,
    AutoplayTick,
    ReturnNavigation,
}

struct TimerSlot {
    token: u64,
    repeating: bool,
    _task: AbortOnDropHandle<()>,
}

/// Every session timer lives here. Dropping a slot aborts its task, and each
/// fire carries a token so a fire already queued for a cancelled timer is
/// discarded by [`TimerRegistry::accept`].
pub struct TimerRegistry {
    sender: mpsc::UnboundedSender<SessionEvent>,
    next_token: u64,
    slots: HashMap<TimerKind, TimerSlot>,
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("armed", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TimerRegistry {
    pub fn new(sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            sender,
            next_token: 0,
            slots: HashMap::new(),
        }
    }

    /// (Re)arms a one-shot timer, replacing any pending one of the same kind.
    pub fn arm_once(&mut self, kind: TimerKind, delay: Duration) {
        let token = self.take_token();
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            let _ = sender.send(SessionEvent::TimerFired { kind, token });
        });
        trace!("Armed {:?} once after {:?}", kind, delay);
        self.install(kind, token, false, task);
    }

    /// (Re)arms a repeating timer whose first fire is one `period` from now.
    pub fn arm_interval(&mut self, kind: TimerKind, period: Duration) {
        let token = self.take_token();
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if sender
                    .send(SessionEvent::TimerFired { kind, token })
                    .is_err()
                {
                    break;
                }
            }
        });
        trace!("Armed {:?} every {:?}", kind, period);
        self.install(kind, token, true, task);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if self.slots.remove(&kind).is_some() {
            trace!("Cancelled {:?}", kind);
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots.contains_key(&kind)
    }

    /// Cancels everything at once; used on every terminal transition and new load.
    pub fn clear_all(&mut self) {
        if !self.slots.is_empty() {
            trace!("Clearing {} timers", self.slots.len());
        }
        self.slots.clear();
    }

    /// Whether a fire is still current. A current one-shot fire disarms its slot.
    pub fn accept(&mut self, kind: TimerKind, token: u64) -> bool {
        match self.slots.get(&kind) {
            Some(slot) if slot.token == token => {
                if !slot.repeating {
                    self.slots.remove(&kind);
                }
                true
            }
            _ => {
                trace!("Dropping stale {:?} fire", kind);
                false
            }
        }
    }

    fn take_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn install(
        &mut self,
        kind: TimerKind,
        token: u64,
        repeating: bool,
        task: tokio::task::JoinHandle<()>,
    ) {
        self.slots.insert(
            kind,
            TimerSlot {
                token,
                repeating,
                _task: AbortOnDropHandle::new(task),
            },
        );
    }
}
