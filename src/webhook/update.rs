//! The slice of Telegram's `Update` object the bot reads.
//!
//! Every field is optional or defaulted so unrelated update kinds (edits,
//! channel posts, callbacks) still decode and are simply ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// Chat id and text of a non-empty text message, if this update has one.
    pub fn text_message(&self) -> Option<(i64, &str)> {
        let message = self.message.as_ref()?;
        let text = message.text.as_deref().filter(|t| !t.is_empty())?;
        Some((message.chat.id, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_text_message() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 10,
                "message": {
                    "message_id": 1,
                    "date": 1700000000,
                    "from": {"id": 7, "is_bot": false, "first_name": "A", "username": "ann"},
                    "chat": {"id": 7, "type": "private"},
                    "text": "buy milk"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(update.text_message(), Some((7, "buy milk")));
    }

    #[test]
    fn non_text_updates_have_no_text_message() {
        let sticker: Update =
            serde_json::from_str(r#"{"update_id": 1, "message": {"chat": {"id": 1}, "sticker": {}}}"#)
                .unwrap();
        assert!(sticker.text_message().is_none());

        let edited: Update =
            serde_json::from_str(r#"{"update_id": 2, "edited_message": {"chat": {"id": 1}}}"#)
                .unwrap();
        assert!(edited.text_message().is_none());

        let empty: Update =
            serde_json::from_str(r#"{"message": {"chat": {"id": 1}, "text": ""}}"#).unwrap();
        assert!(empty.text_message().is_none());
    }
}
