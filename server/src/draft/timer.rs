use std::time::Duration;

use tokio::{sync::mpsc::WeakUnboundedSender, task::JoinHandle};

use super::{game::Round, server::DraftServerRequest};

/// Countdown for the current pick. On expiry posts a timeout for the round it
/// was armed in; the server ignores timeouts for rounds that have passed.
#[derive(Default)]
pub struct PickTimer {
    task: Option<JoinHandle<()>>,
}

impl PickTimer {
    pub fn arm(
        &mut self,
        round: Round,
        after: Duration,
        chan: WeakUnboundedSender<DraftServerRequest>,
    ) {
        self.cancel();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(chan) = chan.upgrade() {
                chan.send(DraftServerRequest::PickTimeout(round)).ok();
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PickTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
