use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::database::models::{Profile, ProfileChanges};

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProfileRequest {
    pub dark_mode: bool,
}

impl From<ProfileRequest> for ProfileChanges {
    fn from(request: ProfileRequest) -> Self {
        Self {
            dark_mode: request.dark_mode,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub user_id: i64,
    pub dark_mode: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            dark_mode: profile.dark_mode,
            created: profile.created,
            updated: profile.updated,
        }
    }
}
