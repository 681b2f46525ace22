use anyhow::anyhow;
use std::{fmt, str};

/// # [`Message`] Identifier
///
/// Assigned by the simulation engine. During the lifetime of a run this
/// identifier uniquely identifies a message, every copy of a message
/// relayed through the network shares it.
///
/// Displayed and parsed with the `M` prefix the simulator uses in its
/// own logs (`M42`). The prefix is optional when parsing.
///
/// [`Message`]: crate::message::Message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

impl MessageId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl str::FromStr for MessageId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('M').unwrap_or(s);
        digits
            .parse()
            .map(Self)
            .map_err(|error| anyhow!("Failed to parse MessageId `{s}`: {error}"))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}
