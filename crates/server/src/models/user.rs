use serde::{Deserialize, Serialize};

/// Who may open a direct conversation with a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DmPolicy {
    Everyone,
    Followers,
    Nobody,
}

/// The slice of a user record the messaging gate reads.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserPrivacy {
    pub id: String,
    pub is_banned: bool,
    pub dm_opt_in: bool,
    pub dm_policy: DmPolicy,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    pub dm_opt_in: bool,
    pub dm_policy: DmPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrivacyRequest {
    pub dm_opt_in: Option<bool>,
    pub dm_policy: Option<DmPolicy>,
}
