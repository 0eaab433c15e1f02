use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

/// Object handle attached to every `Item` in a place file.
///
/// Referents share one textual shape whether they are fixed in the service
/// catalog or generated during a build: `RBX` followed by hex digits.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Referent(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferentError {
    #[error("referent '{0}' must start with '{prefix}'", prefix = Referent::PREFIX)]
    MissingPrefix(String),
    #[error("referent '{0}' must continue with hexadecimal digits after '{prefix}'", prefix = Referent::PREFIX)]
    InvalidDigits(String),
}

impl Referent {
    pub const PREFIX: &'static str = "RBX";

    /// Parses a fixed referent, checking its shape.
    pub fn parse(value: impl Into<String>) -> Result<Self, ReferentError> {
        let value = value.into();
        let Some(digits) = value.strip_prefix(Self::PREFIX) else {
            return Err(ReferentError::MissingPrefix(value));
        };
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(ReferentError::InvalidDigits(value));
        }
        Ok(Referent(value))
    }

    fn from_counter(value: u64) -> Self {
        Referent(format!("{}{value:08X}", Self::PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Referent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Referent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Issues fresh referents for one build.
///
/// Values come from a monotonic counter and never repeat. Referents passed to
/// [`ReferentGenerator::reserving`] (the catalog's fixed ids) are skipped.
#[derive(Clone, Debug)]
pub struct ReferentGenerator {
    counter: u64,
    reserved: HashSet<Referent>,
}

impl ReferentGenerator {
    /// Counter value preceding the first generated referent (`RBX00000065`).
    pub const START: u64 = 100;

    pub fn new() -> Self {
        Self {
            counter: Self::START,
            reserved: HashSet::new(),
        }
    }

    pub fn reserving<'a, I>(reserved: I) -> Self
    where
        I: IntoIterator<Item = &'a Referent>,
    {
        Self {
            counter: Self::START,
            reserved: reserved.into_iter().cloned().collect(),
        }
    }

    pub fn next_referent(&mut self) -> Referent {
        loop {
            self.counter += 1;
            let candidate = Referent::from_counter(self.counter);
            if !self.reserved.contains(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for ReferentGenerator {
    fn default() -> Self {
        Self::new()
    }
}
