// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ProtocolError;
use crate::namespace::NamespaceId;
use crate::observability::messages::namespace::ForeignMessageIgnored;
use crate::observability::messages::StructuredLog;
use crate::protocol::{Endpoint, Envelope, Message};
use tokio::sync::mpsc::{
    self, error::TryRecvError, UnboundedReceiver, UnboundedSender, WeakUnboundedSender,
};

/// Create the inbox of `owner` and an outbox addressing it.
pub fn mailbox(namespace: &NamespaceId, owner: Endpoint) -> (Outbox, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    let outbox = Outbox {
        namespace: namespace.clone(),
        to: owner,
        tx,
    };
    let inbox = Inbox {
        namespace: namespace.clone(),
        owner,
        rx,
    };
    (outbox, inbox)
}

/// Sending half of an endpoint's inbox. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    namespace: NamespaceId,
    to: Endpoint,
    tx: UnboundedSender<Envelope>,
}

impl Outbox {
    /// Post `message` from `from`, stamped with this outbox's namespace.
    pub fn send(&self, from: Endpoint, message: Message) -> Result<(), ProtocolError> {
        let envelope = Envelope {
            namespace: self.namespace.clone(),
            from,
            message,
        };
        self.tx
            .send(envelope)
            .map_err(|_| ProtocolError::ChannelClosed {
                endpoint: self.to.to_string(),
            })
    }

    /// Endpoint this outbox delivers to.
    pub fn endpoint(&self) -> Endpoint {
        self.to
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// A handle that does not keep the inbox open.
    pub fn downgrade(&self) -> WeakOutbox {
        WeakOutbox {
            namespace: self.namespace.clone(),
            to: self.to,
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning [`Outbox`]. An endpoint holds one to itself so that it can hand
/// out outboxes without keeping its own inbox alive.
#[derive(Debug, Clone)]
pub struct WeakOutbox {
    namespace: NamespaceId,
    to: Endpoint,
    tx: WeakUnboundedSender<Envelope>,
}

impl WeakOutbox {
    pub fn upgrade(&self) -> Option<Outbox> {
        self.tx.upgrade().map(|tx| Outbox {
            namespace: self.namespace.clone(),
            to: self.to,
            tx,
        })
    }
}

/// Receiving half owned by exactly one endpoint.
///
/// Envelopes stamped with another namespace are logged and dropped.
#[derive(Debug)]
pub struct Inbox {
    namespace: NamespaceId,
    owner: Endpoint,
    rx: UnboundedReceiver<Envelope>,
}

impl Inbox {
    pub fn owner(&self) -> Endpoint {
        self.owner
    }

    pub fn namespace(&self) -> &NamespaceId {
        &self.namespace
    }

    /// Block the current OS thread until the next envelope arrives.
    ///
    /// Returns `None` once every outbox is gone. Must not be called from
    /// inside an async runtime.
    pub fn recv_blocking(&mut self) -> Option<Envelope> {
        loop {
            let envelope = self.rx.blocking_recv()?;
            if self.accepts(&envelope) {
                return Some(envelope);
            }
        }
    }

    /// Async counterpart of [`Inbox::recv_blocking`].
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            let envelope = self.rx.recv().await?;
            if self.accepts(&envelope) {
                return Some(envelope);
            }
        }
    }

    /// Next queued envelope without blocking.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) if self.accepts(&envelope) => return Some(envelope),
                Ok(_) => continue,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    fn accepts(&self, envelope: &Envelope) -> bool {
        if envelope.namespace == self.namespace {
            return true;
        }
        ForeignMessageIgnored {
            namespace: self.namespace.as_str(),
            received: envelope.namespace.as_str(),
            endpoint: self.owner,
            message: envelope.message.name(),
        }
        .log();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ThreadId;

    fn ns(name: &str) -> NamespaceId {
        NamespaceId::new(name).unwrap()
    }

    #[test]
    fn test_send_and_receive_in_order() {
        let (outbox, mut inbox) = mailbox(&ns("wasm_a"), Endpoint::Coordinator);

        outbox.send(Endpoint::Main, Message::ThreadReady).unwrap();
        outbox.send(Endpoint::Leader, Message::Destroy).unwrap();

        let first = inbox.try_recv().unwrap();
        assert_eq!(first.from, Endpoint::Main);
        assert!(matches!(first.message, Message::ThreadReady));
        let second = inbox.try_recv().unwrap();
        assert!(matches!(second.message, Message::Destroy));
        assert!(inbox.try_recv().is_none());
    }

    #[test]
    fn test_foreign_namespace_is_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inbox = Inbox {
            namespace: ns("wasm_a"),
            owner: Endpoint::Coordinator,
            rx,
        };
        let foreign = Outbox {
            namespace: ns("wasm_b"),
            to: Endpoint::Coordinator,
            tx: tx.clone(),
        };
        let own = Outbox {
            namespace: ns("wasm_a"),
            to: Endpoint::Coordinator,
            tx,
        };

        foreign.send(Endpoint::Main, Message::ThreadReady).unwrap();
        own.send(Endpoint::Leader, Message::Destroy).unwrap();

        let envelope = inbox.try_recv().unwrap();
        assert_eq!(envelope.from, Endpoint::Leader);
        assert!(inbox.try_recv().is_none());
    }

    #[test]
    fn test_send_to_dropped_inbox_fails() {
        let (outbox, inbox) = mailbox(&ns("wasm_a"), Endpoint::Thread(ThreadId::new(3).unwrap()));
        drop(inbox);

        let result = outbox.send(Endpoint::Coordinator, Message::Destroy);
        assert_eq!(
            result,
            Err(ProtocolError::ChannelClosed {
                endpoint: "thread-3".to_string()
            })
        );
        assert!(outbox.is_closed());
    }

    #[test]
    fn test_weak_outbox_does_not_keep_inbox_alive() {
        let (outbox, mut inbox) = mailbox(&ns("wasm_a"), Endpoint::Coordinator);
        let weak = outbox.downgrade();
        assert!(weak.upgrade().is_some());

        drop(outbox);
        assert!(weak.upgrade().is_none());
        assert!(inbox.recv_blocking().is_none());
    }

    #[tokio::test]
    async fn test_async_recv() {
        let (outbox, mut inbox) = mailbox(&ns("wasm_a"), Endpoint::Leader);
        outbox
            .send(Endpoint::Coordinator, Message::CoordinatorReady)
            .unwrap();

        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.from, Endpoint::Coordinator);
        assert_eq!(envelope.message.name(), "CoordinatorReady");
    }
}
