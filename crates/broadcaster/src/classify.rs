//! Maps a failed Telegram send to a disposition.
//!
//! Classification is structural: teloxide exposes typed API errors, so the
//! permanent cases (the bot was removed, or the destination no longer exists)
//! are matched as variants. Substring matching of the raw platform text is
//! kept only for [`ApiError::Unknown`], where nothing better exists.

use teloxide::{ApiError, RequestError};

/// Disposition of a failed delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// The destination can never again receive messages from this bot.
    /// The channel gets retired and is not retried.
    Unreachable,
    /// Expected to possibly succeed on retry; the channel stays unprocessed
    /// and is attempted again next cycle.
    Transient,
}

pub fn classify(err: &RequestError) -> Fault {
    match err {
        RequestError::Api(api) => classify_api(api),
        // Network trouble, flood-wait, malformed payloads: all retryable.
        _ => Fault::Transient,
    }
}

fn classify_api(err: &ApiError) -> Fault {
    match err {
        ApiError::BotBlocked
        | ApiError::BotKicked
        | ApiError::BotKickedFromSupergroup
        | ApiError::ChatNotFound
        | ApiError::GroupDeactivated
        | ApiError::UserDeactivated => Fault::Unreachable,
        ApiError::Unknown(text) => classify_text(text),
        _ => Fault::Transient,
    }
}

fn classify_text(text: &str) -> Fault {
    let text = text.to_lowercase();
    let gone = ["bot was kicked", "bot was blocked", "chat not found", "deactivated"]
        .iter()
        .any(|marker| text.contains(marker));
    if gone { Fault::Unreachable } else { Fault::Transient }
}
