mod id;

pub use self::id::MessageId;
use crate::time::SimTime;
use anyhow::{Result, bail};

/// The originating request of a response message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub id: MessageId,
    /// when the request was created, used for the round trip time
    pub created_at: SimTime,
}

impl Request {
    pub const fn new(id: MessageId, created_at: SimTime) -> Self {
        Self { id, created_at }
    }
}

/// # A view of a simulated message
///
/// The simulation engine owns its messages. On every lifecycle callback
/// it hands the reports a [`Message`] describing the copy the event is
/// about: its identifier, the path it travelled so far, whether it asks
/// for a response and, for a response, the [`Request`] it answers.
///
/// ```
/// # use netreport_core::{message::{Message, MessageId, Request}, SimTime};
/// let response = Message::builder()
///     .id(MessageId::new(7))
///     .path_len(3)
///     .response_to(Request::new(MessageId::new(6), SimTime::from_secs(10.0)))
///     .build()
///     .unwrap();
///
/// assert_eq!(response.hop_count(), 2);
/// assert!(response.is_response());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: MessageId,
    path_len: usize,
    response_size: u64,
    request: Option<Request>,
    received_at: SimTime,
}

#[derive(Debug, Default)]
pub struct MessageBuilder {
    id: Option<MessageId>,
    path_len: Option<usize>,
    response_size: u64,
    request: Option<Request>,
    received_at: SimTime,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// number of hosts on the message's path, the origin included
    pub fn path_len(mut self, path_len: usize) -> Self {
        self.path_len = Some(path_len);
        self
    }

    /// size of the response the message asks for, `0` for none
    pub fn response_size(mut self, response_size: u64) -> Self {
        self.response_size = response_size;
        self
    }

    pub fn response_to(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// time the current copy entered the buffer of the host holding it
    pub fn received_at(mut self, received_at: SimTime) -> Self {
        self.received_at = received_at;
        self
    }

    pub fn build(self) -> Result<Message> {
        let Some(id) = self.id else {
            bail!("Missing message identifier (`id')")
        };
        let path_len = self.path_len.unwrap_or(1);
        if path_len == 0 {
            bail!("Message {id} path must at least contain its origin")
        }

        Ok(Message {
            id,
            path_len,
            response_size: self.response_size,
            request: self.request,
            received_at: self.received_at,
        })
    }
}

impl Message {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// number of hosts on the path so far, the origin included
    #[inline]
    pub fn path_len(&self) -> usize {
        self.path_len
    }

    /// number of relay transfers, i.e. the path without its origin
    #[inline]
    pub fn hop_count(&self) -> usize {
        self.path_len.saturating_sub(1)
    }

    #[inline]
    pub fn response_size(&self) -> u64 {
        self.response_size
    }

    /// `true` if the message reserves a response
    #[inline]
    pub fn expects_response(&self) -> bool {
        self.response_size > 0
    }

    #[inline]
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        self.request.is_some()
    }

    #[inline]
    pub fn received_at(&self) -> SimTime {
        self.received_at
    }

    /// Record the next host on the path. Used by engines that keep a
    /// single [`Message`] value per copy.
    pub fn push_hop(&mut self, received_at: SimTime) {
        self.path_len += 1;
        self.received_at = received_at;
    }
}
