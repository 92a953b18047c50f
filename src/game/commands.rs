use std::fmt;
use tracing::info;

use crate::game::math::Point;

// ============================================================================
// Outbound commands
// ============================================================================

/// Outbound actions of the navigation core. Whoever owns the connection
/// turns these into wire messages.
pub trait CommandSink: Send + Sync {
    /// Ask the server to walk from `from` to `to` on `map`.
    fn emit_move(&self, map: &str, from: Point, to: Point);

    /// Ask the server to transport the character to `map`, arriving at spawn `spawn`.
    fn emit_transport(&self, map: &str, spawn: usize);
}

/// Sink that only logs. Used for dry runs from the command line.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl CommandSink for LogSink {
    fn emit_move(&self, map: &str, from: Point, to: Point) {
        info!("[CMD] move on {}: ({:.1}, {:.1}) -> ({:.1}, {:.1})", map, from.x, from.y, to.x, to.y);
    }

    fn emit_transport(&self, map: &str, spawn: usize) {
        info!("[CMD] transport to {} (spawn {})", map, spawn);
    }
}

// ============================================================================
// Client events
// ============================================================================

/// Lifecycle and social events a bot may react to.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    Connected,
    Disconnected { reason: String },
    Chat { from: String, message: String },
    Party { kind: String, from: String },
}

/// Callbacks registered by bot code, one list per event kind.
#[derive(Default)]
pub struct EventHooks {
    on_connect: Vec<Box<dyn Fn() + Send + Sync>>,
    on_disconnect: Vec<Box<dyn Fn(&str) + Send + Sync>>,
    on_chat: Vec<Box<dyn Fn(&str, &str) + Send + Sync>>,
    on_party: Vec<Box<dyn Fn(&str, &str) + Send + Sync>>,
}

impl fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHooks")
            .field("on_connect", &self.on_connect.len())
            .field("on_disconnect", &self.on_disconnect.len())
            .field("on_chat", &self.on_chat.len())
            .field("on_party", &self.on_party.len())
            .finish()
    }
}

impl EventHooks {
    pub fn on_connect(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.on_connect.push(Box::new(hook));
    }

    pub fn on_disconnect(&mut self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.on_disconnect.push(Box::new(hook));
    }

    /// `hook(from, message)`
    pub fn on_chat(&mut self, hook: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.on_chat.push(Box::new(hook));
    }

    /// `hook(kind, from)`
    pub fn on_party(&mut self, hook: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.on_party.push(Box::new(hook));
    }

    /// Run every hook registered for the event's kind, in registration order.
    pub fn dispatch(&self, event: &ClientEvent) {
        match event {
            ClientEvent::Connected => self.on_connect.iter().for_each(|h| h()),
            ClientEvent::Disconnected { reason } => self.on_disconnect.iter().for_each(|h| h(reason)),
            ClientEvent::Chat { from, message } => self.on_chat.iter().for_each(|h| h(from, message)),
            ClientEvent::Party { kind, from } => self.on_party.iter().for_each(|h| h(kind, from)),
        }
    }
}
