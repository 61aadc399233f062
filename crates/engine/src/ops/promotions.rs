use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use url::Url;
use uuid::Uuid;

use crate::{EngineError, Promotion, PromotionStatus, ResultEngine, promotions};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

impl Engine {
    /// Create a promotion in the `pending` state and return its id.
    ///
    /// Content is validated here so the courier never has to deal with
    /// unsendable campaigns: title and body must be non-empty, links must be
    /// well-formed http(s) urls, and a button label only makes sense together
    /// with a link.
    pub async fn create_promotion(
        &self,
        title: &str,
        body: &str,
        image_url: Option<&str>,
        button_label: Option<&str>,
        button_url: Option<&str>,
    ) -> ResultEngine<Uuid> {
        let title = normalize_required_text(title, "promotion title")?;
        let body = normalize_required_text(body, "promotion body")?;
        let image_url = normalize_optional_text(image_url);
        let button_label = normalize_optional_text(button_label);
        let button_url = normalize_optional_text(button_url);

        if button_label.is_some() != button_url.is_some() {
            return Err(EngineError::InvalidPromotion(
                "button label and button link must be set together".to_string(),
            ));
        }
        if let Some(link) = image_url.as_deref() {
            validate_link(link, "image link")?;
        }
        if let Some(link) = button_url.as_deref() {
            validate_link(link, "button link")?;
        }

        let promotion = Promotion::new(title, body, image_url, button_label, button_url);
        let model = promotions::ActiveModel::try_from(&promotion)?;
        with_tx!(self, |db_tx| {
            model.insert(&db_tx).await?;
            Ok(promotion.id)
        })
    }

    /// Return a [`Promotion`] (snapshot from DB).
    pub async fn promotion(&self, promotion_id: Uuid) -> ResultEngine<Promotion> {
        let model = promotions::Entity::find_by_id(promotion_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("promotion not exists".to_string()))?;
        Promotion::try_from(model)
    }

    /// List every promotion, newest first.
    pub async fn promotions(&self) -> ResultEngine<Vec<Promotion>> {
        let models = promotions::Entity::find()
            .order_by_desc(promotions::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Promotion::try_from).collect()
    }

    /// All campaigns currently in the `sending` state, oldest first.
    ///
    /// An empty result is the normal idle case.
    pub async fn sending_promotions(&self) -> ResultEngine<Vec<Promotion>> {
        let models = promotions::Entity::find()
            .filter(promotions::Column::Status.eq(PromotionStatus::Sending.as_str()))
            .order_by_asc(promotions::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Promotion::try_from).collect()
    }

    /// Start broadcasting: `pending` -> `sending`.
    pub async fn launch_promotion(&self, promotion_id: Uuid) -> ResultEngine<()> {
        self.transition(promotion_id, PromotionStatus::Pending, PromotionStatus::Sending)
            .await
    }

    /// Abort a broadcast: `sending` -> `failed`.
    pub async fn cancel_promotion(&self, promotion_id: Uuid) -> ResultEngine<()> {
        self.transition(promotion_id, PromotionStatus::Sending, PromotionStatus::Failed)
            .await
    }

    async fn transition(
        &self,
        promotion_id: Uuid,
        expected: PromotionStatus,
        next: PromotionStatus,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = promotions::Entity::find_by_id(promotion_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("promotion not exists".to_string()))?;
            let status = PromotionStatus::try_from(model.status.as_str())?;
            if status != expected {
                return Err(EngineError::InvalidTransition(format!(
                    "promotion {promotion_id} is {}, expected {}",
                    status.as_str(),
                    expected.as_str()
                )));
            }

            let active = promotions::ActiveModel {
                id: ActiveValue::Set(promotion_id.to_string()),
                status: ActiveValue::Set(next.as_str().to_string()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Try to take the broadcast lease on a `sending` campaign.
    ///
    /// A single conditional UPDATE: the claim is won when the campaign is
    /// unclaimed, already held by `owner`, or the previous claim is older than
    /// `lease`. Returns whether this instance now holds the claim, so two
    /// broadcaster instances can never process the same campaign at once.
    pub async fn claim_promotion(
        &self,
        promotion_id: Uuid,
        owner: &str,
        lease: Duration,
    ) -> ResultEngine<bool> {
        let now = Utc::now();
        let cutoff = now - lease;
        let result = promotions::Entity::update_many()
            .col_expr(promotions::Column::ClaimedBy, Expr::value(owner))
            .col_expr(promotions::Column::ClaimedAt, Expr::value(now))
            .filter(promotions::Column::Id.eq(promotion_id.to_string()))
            .filter(promotions::Column::Status.eq(PromotionStatus::Sending.as_str()))
            .filter(
                Condition::any()
                    .add(promotions::Column::ClaimedBy.is_null())
                    .add(promotions::Column::ClaimedBy.eq(owner))
                    .add(promotions::Column::ClaimedAt.lt(cutoff)),
            )
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Release the broadcast lease, if `owner` still holds it.
    pub async fn release_promotion(&self, promotion_id: Uuid, owner: &str) -> ResultEngine<()> {
        promotions::Entity::update_many()
            .col_expr(
                promotions::Column::ClaimedBy,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                promotions::Column::ClaimedAt,
                Expr::value(Option::<DateTimeUtc>::None),
            )
            .filter(promotions::Column::Id.eq(promotion_id.to_string()))
            .filter(promotions::Column::ClaimedBy.eq(owner))
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Full-replace update of the delivery-progress fields.
    ///
    /// Idempotent: repeating the call with the same arguments (a crashed cycle
    /// replaying its last write) leaves the row unchanged.
    pub async fn record_progress(
        &self,
        promotion_id: Uuid,
        processed_channels: &BTreeSet<Uuid>,
        total_reach: i64,
        channel_count: i32,
    ) -> ResultEngine<()> {
        let encoded = promotions::encode_processed(processed_channels)?;
        let active = promotions::ActiveModel {
            id: ActiveValue::Set(promotion_id.to_string()),
            processed_channels: ActiveValue::Set(encoded),
            total_reach: ActiveValue::Set(total_reach),
            channel_count: ActiveValue::Set(channel_count),
            ..Default::default()
        };
        active.update(&self.database).await?;
        Ok(())
    }

    /// Finalize a campaign: `sending` -> `sent`, stamping `sent_at` and
    /// dropping the broadcast lease. Only the completion check calls this.
    pub async fn mark_sent(&self, promotion_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = promotions::Entity::find_by_id(promotion_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("promotion not exists".to_string()))?;
            let status = PromotionStatus::try_from(model.status.as_str())?;
            if status != PromotionStatus::Sending {
                return Err(EngineError::InvalidTransition(format!(
                    "promotion {promotion_id} is {}, expected sending",
                    status.as_str()
                )));
            }

            let active = promotions::ActiveModel {
                id: ActiveValue::Set(promotion_id.to_string()),
                status: ActiveValue::Set(PromotionStatus::Sent.as_str().to_string()),
                sent_at: ActiveValue::Set(Some(Utc::now())),
                claimed_by: ActiveValue::Set(None),
                claimed_at: ActiveValue::Set(None),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }
}

fn validate_link(link: &str, label: &str) -> ResultEngine<()> {
    let parsed = Url::parse(link)
        .map_err(|err| EngineError::InvalidPromotion(format!("{label} is not a valid url: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(EngineError::InvalidPromotion(format!(
            "{label} must be http(s), got {}",
            parsed.scheme()
        )));
    }
    Ok(())
}
