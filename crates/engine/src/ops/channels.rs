use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Channel, EngineError, ResultEngine, channels};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

impl Engine {
    /// Register a channel discovered by the marketplace.
    ///
    /// Channels start with `revenue_enabled = false`: carrying broadcasts is
    /// an explicit owner opt-in.
    pub async fn register_channel(
        &self,
        chat_id: i64,
        title: &str,
        username: Option<&str>,
        member_count: i32,
    ) -> ResultEngine<Uuid> {
        let title = normalize_required_text(title, "channel title")
            .map_err(|_| EngineError::InvalidChannel("channel title must not be empty".to_string()))?;
        if member_count < 0 {
            return Err(EngineError::InvalidChannel(
                "member count must be >= 0".to_string(),
            ));
        }
        let username = normalize_optional_text(username);

        with_tx!(self, |db_tx| {
            let exists = channels::Entity::find()
                .filter(channels::Column::ChatId.eq(chat_id))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(chat_id.to_string()));
            }

            let channel = Channel::new(chat_id, title, username, member_count);
            let model: channels::ActiveModel = (&channel).into();
            model.insert(&db_tx).await?;
            Ok(channel.id)
        })
    }

    /// Return a [`Channel`] (snapshot from DB).
    pub async fn channel(&self, channel_id: Uuid) -> ResultEngine<Channel> {
        let model = channels::Entity::find_by_id(channel_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("channel not exists".to_string()))?;
        Channel::try_from(model)
    }

    /// List every registered channel.
    pub async fn channels(&self) -> ResultEngine<Vec<Channel>> {
        let models = channels::Entity::find()
            .order_by_asc(channels::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Channel::try_from).collect()
    }

    /// The destinations currently eligible for broadcasts.
    ///
    /// Read fresh on every call; the broadcaster never caches this across
    /// cycles.
    pub async fn eligible_channels(&self) -> ResultEngine<Vec<Channel>> {
        let models = channels::Entity::find()
            .filter(channels::Column::RevenueEnabled.eq(true))
            .order_by_asc(channels::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Channel::try_from).collect()
    }

    /// Owner-driven opt-in toggle.
    pub async fn set_channel_revenue(&self, channel_id: Uuid, enabled: bool) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            channels::Entity::find_by_id(channel_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("channel not exists".to_string()))?;

            let active = channels::ActiveModel {
                id: ActiveValue::Set(channel_id.to_string()),
                revenue_enabled: ActiveValue::Set(enabled),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Retire a destination that rejected delivery. Irreversible from the
    /// broadcaster's side; only the channel owner can opt back in.
    pub async fn disable_channel(&self, channel_id: Uuid) -> ResultEngine<()> {
        self.set_channel_revenue(channel_id, false).await
    }
}
