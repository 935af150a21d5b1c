use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "users";

/// User model stored in MongoDB "users" collection.
/// No routes are mounted for it yet; the shape is kept for the game flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub account_status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub score: i64,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Banned,
}

impl AccountStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Banned => "banned",
        }
    }
}

// Serde converters for chrono::DateTime <-> mongodb::bson::DateTime
pub(super) mod bson_datetime_as_chrono {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bson_dt = bson::DateTime::from_millis(date.timestamp_millis());
        bson_dt.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bson_dt = bson::DateTime::deserialize(deserializer)?;
        DateTime::from_timestamp_millis(bson_dt.timestamp_millis())
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}

pub(super) mod bson_datetime_as_chrono_option {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let bson_dt = bson::DateTime::from_millis(d.timestamp_millis());
                serializer.serialize_some(&bson_dt)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt_bson_dt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt_bson_dt
            .and_then(|bson_dt| DateTime::from_timestamp_millis(bson_dt.timestamp_millis())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: None,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            account_status: AccountStatus::default(),
            password_reset_token: None,
            password_reset_expires: None,
            last_login: Some(now),
            score: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stored_field_names() {
        let stored = bson::to_document(&user()).unwrap();
        assert_eq!(stored.get_str("passwordHash").unwrap(), "hash");
        assert_eq!(stored.get_str("accountStatus").unwrap(), AccountStatus::Active.as_str());
        assert!(stored.get_datetime("lastLogin").is_ok());
        assert!(!stored.contains_key("passwordResetExpires"));
    }

    #[test]
    fn test_optional_dates_read_back() {
        let stored = bson::to_document(&user()).unwrap();
        let read: User = bson::from_document(stored).unwrap();
        assert!(read.last_login.is_some());
        assert!(read.password_reset_expires.is_none());
    }
}
