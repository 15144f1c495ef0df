use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// A position on the ring. Opaque to everything except the
/// partitioner, which owns parsing, formatting and ring arithmetic;
/// the rest of the system only relies on the total order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Token(pub u64);

impl Token {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
