//! Session identifier type.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

/// Characters allowed in the random suffix.
const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of the random suffix.
const SUFFIX_LENGTH: usize = 6;

/// Identifier of a managed session.
///
/// Generated IDs look like `sc-20250806-153012-a1b2c3`: a timestamp for
/// operator-friendly sorting plus a random suffix for uniqueness when
/// several drivers create sessions within the same second.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new session ID from the current local time.
    pub fn generate() -> Self {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LENGTH)
            .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
            .collect();
        Self(format!("sc-{timestamp}-{suffix}"))
    }

    /// The bare identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fully-qualified resource name of this session.
    pub fn resource_name(&self, project: &str, region: &str) -> String {
        format!("projects/{project}/locations/{region}/sessions/{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = crate::error::SparkConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() > 3
            && s.len() <= 63
            && s.starts_with("sc-")
            && s.bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
            && !s.ends_with('-');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(crate::error::SparkConnectError::InvalidSessionId(s.into()))
        }
    }
}
