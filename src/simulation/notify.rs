//! Transition notifications for observers (sound, particles, mission logic).

use std::sync::mpsc::Sender;

use serde::Serialize;
use tracing::trace;

use super::VehicleId;

/// Kind of attachment-state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Landed,
    Crashed,
    /// Destroyed by damage rather than by a crash landing.
    Destroyed,
    Liftoff,
}

/// One transition, with the body involved if there was one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub vehicle: VehicleId,
    pub kind: TransitionKind,
    pub body: Option<String>,
}

/// Fan-out of notifications to any number of channel receivers.
#[derive(Debug, Default)]
pub struct Notifier {
    senders: Vec<Sender<Notification>>,
}

impl Notifier {
    pub fn subscribe(&mut self, sender: Sender<Notification>) {
        self.senders.push(sender);
    }

    pub fn emit(&mut self, notification: Notification) {
        // receivers that hung up are dropped silently
        self.senders.retain(|sender| match sender.send(notification.clone()) {
            Ok(()) => true,
            Err(_) => {
                trace!("notification receiver disconnected");
                false
            }
        });
    }
}
