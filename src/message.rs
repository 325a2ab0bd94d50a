// Copyright (c) 2025. Licensed under Apache License, Version 2.0.

//! The wire-agnostic [`Message`] and [`MessageType`] data model.

/// Sentinel ordering token for a message that hasn't been stamped by the mailbox yet.
///
/// [`Mailbox::add`](crate::mailbox::Mailbox::add) treats this value as "needs a fresh
/// token from the oracle" rather than a real ordering position.
pub const UNSTAMPED: i64 = i64::MIN;

/// The finite, extensible set of routable message tags.
///
/// `Copy + Eq + Hash` so it is cheap to use as a `HashMap` key in the registry and to
/// pass by value into `notify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    StartNewRound,
    ReceivedAnswer,
}

impl MessageType {
    /// Every recognized message type, in declaration order. The relayer allocates one
    /// mailbox per entry in this list.
    pub const ALL: [MessageType; 2] = [MessageType::StartNewRound, MessageType::ReceivedAnswer];
}

/// An in-flight message: a routing tag, an opaque payload, and an ordering token.
///
/// Immutable after stamping — [`Mailbox::add`](crate::mailbox::Mailbox::add) is the only
/// place that ever assigns [`Message::ordering_token`], and only when it is still
/// [`UNSTAMPED`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: MessageType,
    pub payload: Vec<u8>,
    pub ordering_token: i64,
}

impl Message {
    /// Creates a fresh, unstamped message. The mailbox assigns
    /// [`Message::ordering_token`] on ingress.
    #[must_use]
    pub fn new(topic: MessageType, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic,
            payload: payload.into(),
            ordering_token: UNSTAMPED,
        }
    }

    #[must_use]
    pub fn is_stamped(&self) -> bool { self.ordering_token != UNSTAMPED }
}
