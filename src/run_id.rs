//! Run-scoped collision-avoidance suffixes.
//!
//! Every provisioning run mints one short lowercase suffix and appends it to
//! every resource name it creates, so repeated runs of the same project never
//! collide in the global bucket namespace or the per-region table namespace.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// Length of a run suffix in characters.
pub const RUN_ID_LEN: usize = 5;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Short lowercase alphanumeric suffix identifying one provisioning run.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RunId(String);

impl RunId {
    /// Mints a fresh random suffix.
    #[must_use]
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex.chars().take(RUN_ID_LEN).collect())
    }

    /// Derives a suffix from a clock reading, base-36 encoded.
    ///
    /// Used where a deterministic suffix is preferable to a random one, such
    /// as tests. Readings before the epoch map to the zero suffix.
    #[must_use]
    pub fn from_clock(now: SystemTime) -> Self {
        let seconds = now
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        Self(encode_base36(seconds))
    }

    /// Returns the suffix text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode_base36(value: u64) -> String {
    let mut digits = [0u8; RUN_ID_LEN];
    let mut remaining = value;
    for slot in digits.iter_mut().rev() {
        let digit = remaining.checked_rem(36).unwrap_or(0);
        *slot = BASE36
            .get(usize::try_from(digit).unwrap_or(0))
            .copied()
            .unwrap_or(b'0');
        remaining = remaining.checked_div(36).unwrap_or(0);
    }
    String::from_utf8_lossy(&digits).into_owned()
}
