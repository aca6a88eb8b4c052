//! Outbound fan-out: serialize once, deliver to the targeted connections

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error};

use super::protocol::{ServerMsg, SessionId};

/// Which connections receive a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Only this connection
    Only(SessionId),
    /// Every connection except this one
    AllExcept(SessionId),
    /// Every connection
    All,
}

impl Target {
    pub fn includes(&self, session_id: SessionId) -> bool {
        match *self {
            Target::Only(id) => id == session_id,
            Target::AllExcept(id) => id != session_id,
            Target::All => true,
        }
    }
}

/// A serialized message and its audience
#[derive(Debug, Clone)]
pub struct Outbound {
    pub target: Target,
    pub payload: Arc<str>,
}

/// Publishes outbound messages to every connection's writer task
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Outbound>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.tx.subscribe()
    }

    /// Send to one connection
    pub fn unicast(&self, session_id: SessionId, msg: &ServerMsg) {
        self.publish(Target::Only(session_id), msg);
    }

    /// Send to every connection except the originator
    pub fn broadcast_except(&self, session_id: SessionId, msg: &ServerMsg) {
        self.publish(Target::AllExcept(session_id), msg);
    }

    /// Send to every connection
    pub fn broadcast(&self, msg: &ServerMsg) {
        self.publish(Target::All, msg);
    }

    /// Fire-and-forget: having no subscribers is not an error
    pub fn publish(&self, target: Target, msg: &ServerMsg) {
        let payload = match msg.encode() {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Dropping unencodable server message");
                return;
            }
        };

        if self
            .tx
            .send(Outbound {
                target,
                payload: payload.into(),
            })
            .is_err()
        {
            debug!("No connections subscribed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_select_the_right_connections() {
        let a = SessionId(1);
        let b = SessionId(2);

        assert!(Target::Only(a).includes(a));
        assert!(!Target::Only(a).includes(b));
        assert!(!Target::AllExcept(a).includes(a));
        assert!(Target::AllExcept(a).includes(b));
        assert!(Target::All.includes(a));
    }

    #[tokio::test]
    async fn published_messages_reach_subscribers_pre_serialized() {
        let broadcaster = Broadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast_except(SessionId(4), &ServerMsg::Disconnect(SessionId(9)));

        let outbound = rx.recv().await.unwrap();
        assert_eq!(outbound.target, Target::AllExcept(SessionId(4)));
        assert_eq!(&*outbound.payload, r#"{"event":"disconnect","data":9}"#);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let broadcaster = Broadcaster::new(8);
        broadcaster.broadcast(&ServerMsg::UpdateBullets(Vec::new()));
    }
}
