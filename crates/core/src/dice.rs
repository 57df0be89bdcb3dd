//! Delay shown while the die is "rolling".
//!
//! The timer only defers presentation. It never sees the engine; whoever
//! receives its event performs the roll and the whole turn in one call.

use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::debug;

/// Fixed delay between a roll request and the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceTimer {
    delay: Duration,
}

impl DiceTimer {
    /// Create a timer with the given delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Wait out the delay.
    pub async fn wait(&self) {
        sleep(self.delay).await;
    }

    /// Start a background task that sends `event` once the delay has passed.
    ///
    /// A closed channel is ignored; the receiver has gone away and nobody is
    /// waiting for the die.
    pub fn spawn<T>(self, sender: mpsc::Sender<T>, event: T) -> JoinHandle<()>
    where
        T: Send + 'static,
    {
        tokio::spawn(async move {
            self.wait().await;
            if sender.send(event).await.is_err() {
                debug!("dice timer fired after receiver closed");
            }
        })
    }
}
