// Shared conversation history

use crate::models::ChatTurn;
use crate::utils::lock_mutex_recover;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Append-only log of chat turns shared by every round.
///
/// Rounds are serialized in the order they were queued with
/// [`ChatHistory::enqueue_round`], so the user and assistant turns of one
/// round are never interleaved with another's.
pub struct ChatHistory {
    turns: Mutex<Vec<ChatTurn>>,
    /// Completion signal of the most recently queued round
    queue_tail: Mutex<Option<oneshot::Receiver<()>>>,
}

/// Place in the round queue, taken when a message is submitted
pub struct RoundTicket {
    previous: Option<oneshot::Receiver<()>>,
    done: oneshot::Sender<()>,
}

/// Exclusive use of the conversation; the next round starts once this drops
pub struct RoundTurn {
    _done: oneshot::Sender<()>,
}

impl RoundTicket {
    /// Wait until every round queued before this one has finished
    pub async fn wait(self) -> RoundTurn {
        if let Some(previous) = self.previous {
            // A dropped sender also means the previous round is over
            let _ = previous.await;
        }
        RoundTurn { _done: self.done }
    }
}

impl ChatHistory {
    pub fn new() -> Self {
        Self {
            turns: Mutex::new(Vec::new()),
            queue_tail: Mutex::new(None),
        }
    }

    /// Queue a round behind every round queued so far
    pub fn enqueue_round(&self) -> RoundTicket {
        let (done, next) = oneshot::channel();
        let previous = lock_mutex_recover(&self.queue_tail).replace(next);
        RoundTicket { previous, done }
    }

    pub fn append(&self, turn: ChatTurn) {
        lock_mutex_recover(&self.turns).push(turn);
    }

    /// Copy of the turns recorded so far
    pub fn snapshot(&self) -> Vec<ChatTurn> {
        lock_mutex_recover(&self.turns).clone()
    }

    pub fn len(&self) -> usize {
        lock_mutex_recover(&self.turns).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new()
    }
}
