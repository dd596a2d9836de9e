use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

/// Server-side session. `key` is the SHA-256 digest of the cookie token, so a
/// leaked table does not hand out live cookies.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub key: String,
    pub user_id: i64,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl Session {
    pub fn new(key: String, user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            key,
            user_id,
            created: now,
            expires: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}
