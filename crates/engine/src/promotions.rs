//! Promotion campaigns and their delivery progress.
//!
//! A `Promotion` is one advertising broadcast: content (title, body, optional
//! photo, optional call-to-action button), a lifecycle status, and the
//! progress the broadcaster has made through the channel registry. The
//! processed set is stored as a JSON array of channel ids so the uniqueness
//! invariant is structural.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    Pending,
    Sending,
    Sent,
    Failed,
}

impl PromotionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for PromotionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "sending" => Ok(Self::Sending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::InvalidPromotion(format!(
                "invalid promotion status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub button_label: Option<String>,
    pub button_url: Option<String>,
    pub status: PromotionStatus,
    /// Channels already delivered to. A set: a destination appears at most once.
    pub processed_channels: BTreeSet<Uuid>,
    pub total_reach: i64,
    pub channel_count: i32,
    /// Written by the click redirector, never by the broadcaster.
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Promotion {
    pub fn new(
        title: String,
        body: String,
        image_url: Option<String>,
        button_label: Option<String>,
        button_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            body,
            image_url,
            button_label,
            button_url,
            status: PromotionStatus::Pending,
            processed_channels: BTreeSet::new(),
            total_reach: 0,
            channel_count: 0,
            click_count: 0,
            created_at: Utc::now(),
            sent_at: None,
        }
    }
}

pub(crate) fn encode_processed(processed: &BTreeSet<Uuid>) -> ResultEngine<String> {
    serde_json::to_string(processed)
        .map_err(|err| EngineError::InvalidPromotion(format!("unencodable processed set: {err}")))
}

fn decode_processed(raw: &str) -> ResultEngine<BTreeSet<Uuid>> {
    serde_json::from_str(raw)
        .map_err(|err| EngineError::InvalidPromotion(format!("corrupt processed set: {err}")))
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub button_label: Option<String>,
    pub button_url: Option<String>,
    pub status: String,
    pub processed_channels: String,
    pub total_reach: i64,
    pub channel_count: i32,
    pub click_count: i64,
    pub created_at: DateTimeUtc,
    pub sent_at: Option<DateTimeUtc>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Promotion> for ActiveModel {
    type Error = EngineError;

    fn try_from(promotion: &Promotion) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(promotion.id.to_string()),
            title: ActiveValue::Set(promotion.title.clone()),
            body: ActiveValue::Set(promotion.body.clone()),
            image_url: ActiveValue::Set(promotion.image_url.clone()),
            button_label: ActiveValue::Set(promotion.button_label.clone()),
            button_url: ActiveValue::Set(promotion.button_url.clone()),
            status: ActiveValue::Set(promotion.status.as_str().to_string()),
            processed_channels: ActiveValue::Set(encode_processed(&promotion.processed_channels)?),
            total_reach: ActiveValue::Set(promotion.total_reach),
            channel_count: ActiveValue::Set(promotion.channel_count),
            click_count: ActiveValue::Set(promotion.click_count),
            created_at: ActiveValue::Set(promotion.created_at),
            sent_at: ActiveValue::Set(promotion.sent_at),
            claimed_by: ActiveValue::Set(None),
            claimed_at: ActiveValue::Set(None),
        })
    }
}

impl TryFrom<Model> for Promotion {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("promotion not exists".to_string()))?,
            title: model.title,
            body: model.body,
            image_url: model.image_url,
            button_label: model.button_label,
            button_url: model.button_url,
            status: PromotionStatus::try_from(model.status.as_str())?,
            processed_channels: decode_processed(&model.processed_channels)?,
            total_reach: model.total_reach,
            channel_count: model.channel_count,
            click_count: model.click_count,
            created_at: model.created_at,
            sent_at: model.sent_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(promotion: &Promotion) -> Model {
        Model {
            id: promotion.id.to_string(),
            title: promotion.title.clone(),
            body: promotion.body.clone(),
            image_url: promotion.image_url.clone(),
            button_label: promotion.button_label.clone(),
            button_url: promotion.button_url.clone(),
            status: promotion.status.as_str().to_string(),
            processed_channels: encode_processed(&promotion.processed_channels).unwrap(),
            total_reach: promotion.total_reach,
            channel_count: promotion.channel_count,
            click_count: promotion.click_count,
            created_at: promotion.created_at,
            sent_at: promotion.sent_at,
            claimed_by: None,
            claimed_at: None,
        }
    }

    #[test]
    fn status_round_trip() {
        for status in [
            PromotionStatus::Pending,
            PromotionStatus::Sending,
            PromotionStatus::Sent,
            PromotionStatus::Failed,
        ] {
            assert_eq!(PromotionStatus::try_from(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(PromotionStatus::try_from("archived").is_err());
    }

    #[test]
    fn model_round_trip_keeps_processed_set() {
        let mut promotion = Promotion::new(
            "Summer sale".to_string(),
            "Half price on every bot".to_string(),
            None,
            Some("Open shop".to_string()),
            Some("https://example.com/shop".to_string()),
        );
        promotion.processed_channels.insert(Uuid::new_v4());
        promotion.processed_channels.insert(Uuid::new_v4());
        promotion.total_reach = 1200;
        promotion.channel_count = 2;

        let restored = Promotion::try_from(model(&promotion)).unwrap();
        assert_eq!(restored, promotion);
    }

    #[test]
    fn corrupt_processed_set_is_rejected() {
        let promotion = Promotion::new("T".to_string(), "B".to_string(), None, None, None);
        let mut model = model(&promotion);
        model.processed_channels = "not json".to_string();
        assert!(Promotion::try_from(model).is_err());
    }
}
