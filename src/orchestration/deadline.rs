//! Deadline guard
//!
//! A one-shot timer armed with the invocation's remaining budget. If it
//! elapses before the dispatcher finishes, the guard claims the completion
//! latch, reports FAILED to the orchestrator and signals the dispatcher
//! that the invocation has to halt.

use std::{
    future::pending,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use serde_json::Map;
use tokio::sync::{oneshot, watch};

use crate::core::{Claimant, DeliveryError, ResponseStatus};

use super::responder::{Delivery, Responder};

pub const TIMEOUT_REASON: &str = "Execution is about to time out, sending failure message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GuardState {
    Idle = 0,
    Armed = 1,
    Fired = 2,
    Disarmed = 3,
}

impl GuardState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => GuardState::Idle,
            1 => GuardState::Armed,
            2 => GuardState::Fired,
            _ => GuardState::Disarmed,
        }
    }
}

pub struct DeadlineGuard {
    state: Arc<AtomicU8>,
    responder: Arc<Responder>,
    cancel: watch::Sender<bool>,
    fired: Option<oneshot::Receiver<Result<(), DeliveryError>>>,
}

impl DeadlineGuard {
    pub fn new(responder: Arc<Responder>) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            state: Arc::new(AtomicU8::new(GuardState::Idle as u8)),
            responder,
            cancel,
            fired: None,
        }
    }

    pub fn state(&self) -> GuardState {
        GuardState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Start the countdown on its own task. Only the first call arms.
    pub fn arm(&mut self, budget: Duration) {
        if !self.transition(GuardState::Idle, GuardState::Armed) {
            self.responder.log().warn(format_args!(
                "Deadline guard is {:?}, ignoring arm request",
                self.state()
            ));
            return;
        }

        let (fired_tx, fired_rx) = oneshot::channel();
        self.fired = Some(fired_rx);

        let mut cancel = self.cancel.subscribe();
        let state = self.state.clone();
        let responder = self.responder.clone();
        self.responder
            .log()
            .debug(format_args!("Deadline guard armed for {budget:?}"));

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.changed() => return,
                _ = tokio::time::sleep(budget) => {}
            }

            if state
                .compare_exchange(
                    GuardState::Armed as u8,
                    GuardState::Fired as u8,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_err()
            {
                return;
            }

            let log = responder.log();
            log.error(format_args!("{TIMEOUT_REASON}"));

            let physical_resource_id = responder.request().physical_resource_id();
            let sent = responder
                .send(
                    Claimant::DeadlineGuard,
                    ResponseStatus::Failed,
                    Map::new(),
                    Some(TIMEOUT_REASON),
                    physical_resource_id,
                )
                .await;

            match sent {
                Ok(Delivery::Sent) => {
                    let _ = fired_tx.send(Ok(()));
                }
                // the dispatcher already answered, nothing left to guard
                Ok(Delivery::Suppressed) => {
                    state.store(GuardState::Disarmed as u8, Ordering::SeqCst);
                }
                Err(e) => {
                    let _ = fired_tx.send(Err(e));
                }
            }
        });
    }

    /// Resolves once the guard has fired and sent its FAILED response.
    ///
    /// Never resolves if the guard is disarmed or loses the latch. If the
    /// guard task dies after claiming the latch, resolves with a transport
    /// error so the dispatcher still halts.
    pub async fn fired(&mut self) -> Result<(), DeliveryError> {
        match self.fired.as_mut() {
            Some(rx) => match rx.await {
                Ok(result) => result,
                Err(_) if self.responder.latch().winner() == Some(Claimant::DeadlineGuard) => {
                    self.responder
                        .log()
                        .error(format_args!("Deadline guard task aborted after claiming the response"));
                    Err(DeliveryError::Transport(
                        "deadline guard task aborted".to_string(),
                    ))
                }
                Err(_) => pending().await,
            },
            None => pending().await,
        }
    }

    /// Stop the countdown. Safe to call any number of times.
    pub fn disarm(&self) {
        if self.transition(GuardState::Armed, GuardState::Disarmed)
            || self.transition(GuardState::Idle, GuardState::Disarmed)
        {
            self.responder.log().debug(format_args!("Deadline guard disarmed"));
        }
        let _ = self.cancel.send(true);
    }

    fn transition(&self, from: GuardState, to: GuardState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.disarm();
    }
}
