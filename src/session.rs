//! The transport seam between the coordinator and an embedder
//!
//! The crate never owns sockets. An embedder hands the coordinator a
//! [`Tunnel`] for the sending participant and a broadcast closure for
//! everyone else; what those do with the messages is entirely up to the
//! embedding server.

use crate::{registry::RoomCode, ReplyMessage, UpdateMessage};

/// A one-way channel to a single connected participant
pub trait Tunnel {
    /// Delivers a push that also went out to others
    fn send_message(&self, message: &UpdateMessage);

    /// Delivers a reply meant only for this participant
    fn send_reply(&self, reply: &ReplyMessage);

    /// Closes the channel
    fn close(self);
}

/// Who a broadcast is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience<'a> {
    /// Every participant currently in the named room
    Room(&'a RoomCode),
    /// Every connected participant, regardless of room
    Everyone,
}
