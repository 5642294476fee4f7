//! Profile records of the membership directory.
//!
//! Profiles are shared across trips and keyed by `UserId`. A placeholder is
//! written the first time an unknown id is resolved so later resolutions stay
//! stable; a real profile replaces it as soon as the account authenticates.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Email recorded on placeholder profiles.
pub const UNKNOWN_EMAIL: &str = "unknown";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub display_name: String,
    pub email: String,
    /// `true` when synthesized by the directory rather than supplied by the
    /// account owner.
    pub placeholder: bool,
}

impl ProfileRecord {
    #[must_use]
    pub fn new(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            email: email.into(),
            placeholder: false,
        }
    }

    #[must_use]
    pub fn placeholder_for(user_id: &UserId) -> Self {
        Self {
            display_name: user_id.shortened(),
            email: UNKNOWN_EMAIL.to_string(),
            placeholder: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub placeholder: bool,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_record(
        user_id: &UserId,
        record: &ProfileRecord,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: ActiveValue::Set(user_id.to_string()),
            display_name: ActiveValue::Set(record.display_name.clone()),
            email: ActiveValue::Set(record.email.clone()),
            placeholder: ActiveValue::Set(record.placeholder),
            updated_at: ActiveValue::Set(updated_at),
        }
    }
}

impl From<Model> for ProfileRecord {
    fn from(model: Model) -> Self {
        Self {
            display_name: model.display_name,
            email: model.email,
            placeholder: model.placeholder,
        }
    }
}
