use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UTC timestamp wrapper used by every wire model.
///
/// Orders chronologically, which is what message sequences sort by.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// The current instant.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn orders_chronologically() {
        let earlier = Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap());
        let later = Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 1).unwrap());

        assert!(earlier < later);
    }

    #[test]
    fn serde_round_trip() {
        let ts = Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap());
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();

        assert_eq!(ts, back);
    }
}
