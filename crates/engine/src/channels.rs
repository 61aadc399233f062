//! Broadcast channels registered with the marketplace.
//!
//! A channel is a Telegram chat whose owner can opt in to carry promotion
//! broadcasts. `revenue_enabled` is the opt-in flag; the broadcaster flips it
//! off permanently when the platform reports the destination unreachable.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    /// Telegram chat identifier the courier sends to.
    pub chat_id: i64,
    pub title: String,
    pub username: Option<String>,
    /// Audience size used for reach accounting.
    pub member_count: i32,
    pub revenue_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Channel {
    pub fn new(chat_id: i64, title: String, username: Option<String>, member_count: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            title,
            username,
            member_count,
            revenue_enabled: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "channels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub chat_id: i64,
    pub title: String,
    pub username: Option<String>,
    pub member_count: i32,
    pub revenue_enabled: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Channel> for ActiveModel {
    fn from(channel: &Channel) -> Self {
        Self {
            id: ActiveValue::Set(channel.id.to_string()),
            chat_id: ActiveValue::Set(channel.chat_id),
            title: ActiveValue::Set(channel.title.clone()),
            username: ActiveValue::Set(channel.username.clone()),
            member_count: ActiveValue::Set(channel.member_count),
            revenue_enabled: ActiveValue::Set(channel.revenue_enabled),
            created_at: ActiveValue::Set(channel.created_at),
        }
    }
}

impl TryFrom<Model> for Channel {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("channel not exists".to_string()))?,
            chat_id: model.chat_id,
            title: model.title,
            username: model.username,
            member_count: model.member_count,
            revenue_enabled: model.revenue_enabled,
            created_at: model.created_at,
        })
    }
}
