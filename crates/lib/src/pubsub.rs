//! Channel bus for SUBSCRIBE/PUBLISH.
//!
//! Subscriptions are tracked per channel as (connection, outbound sender)
//! pairs. Published messages are pushed through each subscriber's outbound
//! channel; the connection read loop multiplexes those pushes with socket
//! reads, so delivery never blocks the publisher.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::acl::ConnId;
use crate::wire;

/// Outbound push channel of a connection.
pub type PushSender = mpsc::UnboundedSender<Vec<u8>>;

#[derive(Debug)]
struct Subscriber {
    conn: ConnId,
    sender: PushSender,
}

/// Channel name to subscriber registry.
#[derive(Debug, Default)]
pub struct PubSub {
    channels: Mutex<HashMap<String, Vec<Subscriber>>>,
}

impl PubSub {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to the given channels.
    ///
    /// Subscribing twice to the same channel is a no-op.
    pub fn subscribe(&self, conn: ConnId, sender: &PushSender, channels: &[String]) {
        let mut registry = self.channels.lock().unwrap();
        for channel in channels {
            let subscribers = registry.entry(channel.clone()).or_default();
            if subscribers.iter().any(|s| s.conn == conn) {
                continue;
            }
            subscribers.push(Subscriber {
                conn,
                sender: sender.clone(),
            });
        }
    }

    /// Publish a payload to a channel.
    ///
    /// Returns the number of subscribers the message was delivered to.
    /// Subscribers whose connection is gone are dropped from the channel.
    pub fn publish(&self, channel: &str, payload: &str) -> usize {
        let message = wire::bulk_array(["message", channel, payload]);

        let mut registry = self.channels.lock().unwrap();
        let Some(subscribers) = registry.get_mut(channel) else {
            return 0;
        };

        subscribers.retain(|s| s.sender.send(message.clone()).is_ok());
        subscribers.len()
    }

    /// Remove a closing connection from every channel.
    pub fn drop_connection(&self, conn: ConnId) {
        let mut registry = self.channels.lock().unwrap();
        for subscribers in registry.values_mut() {
            subscribers.retain(|s| s.conn != conn);
        }
        registry.retain(|_, subscribers| !subscribers.is_empty());
    }

    /// Number of subscribers currently on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .unwrap()
            .get(channel)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}
