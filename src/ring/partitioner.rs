use super::Token;
use crate::BootstrapError;
use crate::Result;

/// Token arithmetic and the canonical token string form.
///
/// All network-visible token strings go through this trait, so a
/// cluster agrees on one encoding as long as every node runs the same
/// partitioner.
pub trait Partitioner: Send + Sync + 'static {
    /// Parse a canonical token string, as produced by
    /// [`Partitioner::token_to_string`].
    fn token_from_string(
        &self,
        s: &str,
    ) -> Result<Token>;

    fn token_to_string(
        &self,
        token: &Token,
    ) -> String;

    /// The token halfway along the arc `(left, right]`, wrap-aware.
    /// Equal boundaries are treated as the full ring.
    fn midpoint(
        &self,
        left: &Token,
        right: &Token,
    ) -> Token;

    /// The size of the token space.
    fn span(&self) -> u128;
}

/// Tokens are plain integers on a ring of configurable span. The span
/// defaults to the full `u64` space; tests shrink it to keep scenarios
/// readable.
pub struct ModuloPartitioner {
    span: u128,
}

impl ModuloPartitioner {
    pub fn new(span: u128) -> Self {
        debug_assert!(span > 1);
        Self { span }
    }
}

impl Default for ModuloPartitioner {
    fn default() -> Self {
        Self::new(1u128 << 64)
    }
}

impl Partitioner for ModuloPartitioner {
    fn token_from_string(
        &self,
        s: &str,
    ) -> Result<Token> {
        let value = s
            .trim()
            .parse::<u64>()
            .map_err(|e| BootstrapError::InvalidToken(format!("{s}: {e}")))?;
        if (value as u128) >= self.span {
            return Err(BootstrapError::InvalidToken(format!(
                "{value} outside ring span {}",
                self.span
            ))
            .into());
        }
        Ok(Token(value))
    }

    fn token_to_string(
        &self,
        token: &Token,
    ) -> String {
        token.to_string()
    }

    fn midpoint(
        &self,
        left: &Token,
        right: &Token,
    ) -> Token {
        let l = left.0 as u128;
        let r = right.0 as u128;
        let mut arc = (r + self.span - l) % self.span;
        if arc == 0 {
            arc = self.span;
        }
        Token(((l + arc / 2) % self.span) as u64)
    }

    fn span(&self) -> u128 {
        self.span
    }
}
