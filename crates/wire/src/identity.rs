//! Client identity: a monotonically increasing identifier assigned by the
//! coordinator, with a dedicated "unset" sentinel for clients that have
//! never registered.

use serde::{Deserialize, Serialize};

/// A client's identity as assigned by the coordinator.
///
/// `0` is reserved as the "unset" sentinel, adapted from the original's
/// signed `-1` to fit an unsigned monotone counter starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientIdentity(pub u64);

impl ClientIdentity {
    /// The sentinel identity presented by a client that has never
    /// registered with a coordinator.
    pub const UNSET: Self = Self(0);

    /// Returns `true` if this is the unset sentinel.
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ClientIdentity {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}
