//! Delivery of one promotion to one channel.

use async_trait::async_trait;
use engine::{Channel, Promotion};
use teloxide::{
    prelude::*,
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile},
};
use url::Url;

use crate::classify::{Fault, classify};

/// Result of a single delivery attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum DeliveryOutcome {
    Delivered {
        /// Audience added to the campaign's reach: the channel's member count.
        reach_added: i64,
    },
    Failed {
        fault: Fault,
        message: String,
    },
}

/// Sends one campaign to one destination.
///
/// Must not persist anything: the caller records a channel as processed only
/// after a confirmed send.
#[async_trait]
pub trait Courier: Send + Sync {
    async fn deliver(&self, promotion: &Promotion, channel: &Channel) -> DeliveryOutcome;
}

/// The production courier, sending through the Telegram bot API.
#[derive(Clone)]
pub struct TelegramCourier {
    bot: Bot,
}

impl TelegramCourier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Courier for TelegramCourier {
    async fn deliver(&self, promotion: &Promotion, channel: &Channel) -> DeliveryOutcome {
        let chat = ChatId(channel.chat_id);
        let text = message_text(promotion);
        let keyboard = cta_keyboard(promotion);

        let sent = match photo_url(promotion) {
            Some(photo) => {
                let mut request = self.bot.send_photo(chat, InputFile::url(photo)).caption(text);
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(keyboard);
                }
                request.await.map(drop)
            }
            None => {
                let mut request = self.bot.send_message(chat, text);
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(keyboard);
                }
                request.await.map(drop)
            }
        };

        match sent {
            Ok(()) => DeliveryOutcome::Delivered {
                reach_added: i64::from(channel.member_count),
            },
            Err(err) => DeliveryOutcome::Failed {
                fault: classify(&err),
                message: err.to_string(),
            },
        }
    }
}

fn message_text(promotion: &Promotion) -> String {
    format!("{}\n\n{}", promotion.title, promotion.body)
}

/// The image link, if present and parseable. The store validates links on
/// creation, so a parse failure here means the row was written from outside;
/// degrade to a plain text send rather than stalling the campaign.
fn photo_url(promotion: &Promotion) -> Option<Url> {
    let raw = promotion.image_url.as_deref()?;
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::warn!(
                promotion = %promotion.id,
                "unusable image link, sending without photo: {err}"
            );
            None
        }
    }
}

fn cta_keyboard(promotion: &Promotion) -> Option<InlineKeyboardMarkup> {
    let label = promotion.button_label.as_deref()?;
    let raw = promotion.button_url.as_deref()?;
    match Url::parse(raw) {
        Ok(link) => Some(InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::url(label, link),
        ]])),
        Err(err) => {
            tracing::warn!(
                promotion = %promotion.id,
                "unusable button link, sending without button: {err}"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promotion() -> Promotion {
        Promotion::new(
            "New bots this week".to_string(),
            "Ten fresh bots landed in the catalog.".to_string(),
            None,
            Some("Browse".to_string()),
            Some("https://example.com/catalog".to_string()),
        )
    }

    #[test]
    fn text_is_title_then_body() {
        let text = message_text(&promotion());
        assert_eq!(text, "New bots this week\n\nTen fresh bots landed in the catalog.");
    }

    #[test]
    fn keyboard_is_one_url_button() {
        let keyboard = cta_keyboard(&promotion()).unwrap();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0].len(), 1);
    }

    #[test]
    fn bad_button_link_is_dropped() {
        let mut promotion = promotion();
        promotion.button_url = Some("not a url".to_string());
        assert!(cta_keyboard(&promotion).is_none());
    }

    #[test]
    fn no_button_without_label() {
        let mut promotion = promotion();
        promotion.button_label = None;
        assert!(cta_keyboard(&promotion).is_none());
    }
}
