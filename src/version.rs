// Copyright (c) 2016 Anatoly Ikorsky
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use serde::Serialize;

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::error::ComparisonError;

/// A single component of a server version string.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(untagged)]
pub enum VersionToken {
    Num(u64),
    Text(String),
}

impl VersionToken {
    fn try_cmp(&self, other: &VersionToken) -> Option<Ordering> {
        match (self, other) {
            (VersionToken::Num(a), VersionToken::Num(b)) => Some(a.cmp(b)),
            (VersionToken::Text(a), VersionToken::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionToken::Num(n) => write!(f, "{}", n),
            VersionToken::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for VersionToken {
    fn from(n: u64) -> Self {
        VersionToken::Num(n)
    }
}

impl From<&str> for VersionToken {
    fn from(s: &str) -> Self {
        VersionToken::Text(s.to_owned())
    }
}

/// Server version as reported by the server, e.g. `5.1.44-beta` is `[5, 1, 44, "beta"]`.
///
/// `ServerVersion` intentionally does not implement `PartialOrd`. Use [`ServerVersion::try_cmp`]
/// or [`ServerVersion::at_least`], which report a [`ComparisonError`] instead of ordering
/// a number against a text token.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServerVersion {
    tokens: Vec<VersionToken>,
}

impl ServerVersion {
    /// Creates a purely numeric version, e.g. `ServerVersion::numeric(&[4, 1, 0])`.
    pub fn numeric(parts: &[u64]) -> Self {
        ServerVersion {
            tokens: parts.iter().copied().map(VersionToken::Num).collect(),
        }
    }

    pub fn tokens(&self) -> &[VersionToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Lexicographic comparison.
    ///
    /// A version that is a prefix of another one is the lesser one.
    pub fn try_cmp(&self, other: &ServerVersion) -> Result<Ordering, ComparisonError> {
        for (position, (left, right)) in self.tokens.iter().zip(other.tokens.iter()).enumerate() {
            if left == right {
                continue;
            }
            return left.try_cmp(right).ok_or_else(|| ComparisonError {
                position,
                left: left.clone(),
                right: right.clone(),
            });
        }
        Ok(self.tokens.len().cmp(&other.tokens.len()))
    }

    /// `self >= other`.
    pub fn at_least(&self, other: &ServerVersion) -> Result<bool, ComparisonError> {
        self.try_cmp(other).map(|ord| ord != Ordering::Less)
    }

    /// `self < other`.
    pub fn is_before(&self, other: &ServerVersion) -> Result<bool, ComparisonError> {
        self.try_cmp(other).map(|ord| ord == Ordering::Less)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl From<Vec<VersionToken>> for ServerVersion {
    fn from(tokens: Vec<VersionToken>) -> Self {
        ServerVersion { tokens }
    }
}

impl From<(u64, u64, u64)> for ServerVersion {
    fn from((major, minor, patch): (u64, u64, u64)) -> Self {
        ServerVersion::numeric(&[major, minor, patch])
    }
}

impl FromStr for ServerVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_version(s))
    }
}

/// Splits a raw server version string on runs of `.` and `-`.
///
/// Numeric tokens become [`VersionToken::Num`], anything else is kept verbatim.
/// Never fails; an empty input gives an empty version.
pub fn parse_version(raw: &str) -> ServerVersion {
    let tokens = raw
        .trim()
        .split(&['.', '-'][..])
        .filter(|token| !token.is_empty())
        .map(|token| match u64::from_str(token) {
            Ok(n) => VersionToken::Num(n),
            Err(_) => VersionToken::Text(token.to_owned()),
        })
        .collect();

    ServerVersion { tokens }
}
