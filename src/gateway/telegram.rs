//! Telegram Bot API transport
//!
//! Outbound calls are plain JSON POSTs to `{api_url}/bot{token}/{method}`.
//! Inbound traffic is read with `getUpdates` long polling and turned into
//! dialog events.

use super::{
    ButtonOption, GatewayError, Markup, MessageRef, MessagingGateway, PhotoRef, PhotoUpload,
    PhotoVariant,
};
use crate::config::BotConfig;
use crate::dialog::Event;
use async_trait::async_trait;
use futures::Stream;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Slack on top of the long-poll wait before the HTTP client gives up
const REQUEST_GRACE: Duration = Duration::from_secs(10);

/// An inbound event addressed to one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub conversation_id: String,
    pub event: Event,
}

/// Telegram gateway implementation
pub struct TelegramGateway {
    client: Client,
    /// `{api_url}/bot{token}`; contains the token, never logged
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramGateway {
    pub fn new(config: &BotConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.poll_timeout + REQUEST_GRACE)
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.api_url, config.token),
            poll_timeout: config.poll_timeout,
        })
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<R, GatewayError> {
        let response = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(params)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors carry the URL, which carries the token
                let e = e.without_url();
                if e.is_timeout() {
                    GatewayError::network(format!("{method}: request timeout: {e}"))
                } else {
                    GatewayError::network(format!("{method}: request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("{method}: failed to read response: {}", e.without_url())))?;

        parse_response(method, status, &body)
    }

    /// Fetch pending updates, waiting up to the poll timeout for new ones
    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, GatewayError> {
        let mut params = json!({
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            params["offset"] = json!(offset);
        }
        self.call("getUpdates", &params).await
    }

    /// Username of the bot behind the token, used to tell which
    /// group-chat commands are addressed to it
    pub async fn username(&self) -> Result<String, GatewayError> {
        let me: BotUser = self.call("getMe", &json!({})).await?;
        me.username
            .ok_or_else(|| GatewayError::decode("getMe: bot account has no username"))
    }

    /// Endless stream of inbound events.
    ///
    /// Each update is acknowledged (by advancing the offset) once fetched;
    /// updates that carry nothing the dialog understands are dropped.
    /// Polling errors are yielded and polling resumes on the next read.
    pub fn inbound(
        self: Arc<Self>,
        bot_username: String,
    ) -> impl Stream<Item = Result<Inbound, GatewayError>> + Send {
        let cursor = PollCursor::new(bot_username);

        futures::stream::unfold((self, cursor), |(gateway, mut cursor)| async move {
            let next = next_inbound(&mut cursor, |offset| gateway.get_updates(offset)).await;
            Some((next, (gateway, cursor)))
        })
    }
}

/// Position in the update feed plus events fetched but not yet handed out
struct PollCursor {
    bot_username: String,
    offset: Option<i64>,
    pending: VecDeque<Inbound>,
}

impl PollCursor {
    fn new(bot_username: String) -> Self {
        Self {
            bot_username,
            offset: None,
            pending: VecDeque::new(),
        }
    }

    /// Take in one fetched batch. The offset moves past every update,
    /// including the ones that are dropped.
    fn absorb(&mut self, updates: Vec<Update>) {
        for update in updates {
            let update_id = update.update_id;
            self.offset = Some(self.offset.map_or(update_id + 1, |o| o.max(update_id + 1)));
            match update_to_inbound(update, &self.bot_username) {
                Some(inbound) => self.pending.push_back(inbound),
                None => tracing::debug!(update_id, "Dropping unsupported update"),
            }
        }
    }
}

/// Hand out the next buffered event, fetching batches until one arrives.
/// A failed fetch leaves the cursor untouched.
async fn next_inbound<F, Fut>(cursor: &mut PollCursor, mut fetch: F) -> Result<Inbound, GatewayError>
where
    F: FnMut(Option<i64>) -> Fut,
    Fut: Future<Output = Result<Vec<Update>, GatewayError>>,
{
    loop {
        if let Some(inbound) = cursor.pending.pop_front() {
            return Ok(inbound);
        }
        let updates = fetch(cursor.offset).await?;
        cursor.absorb(updates);
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_text(
        &self,
        conversation_id: &str,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<MessageRef, GatewayError> {
        let mut params = json!({
            "chat_id": conversation_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = markup {
            params["reply_markup"] = markup_json(markup);
        }
        let message: Message = self.call("sendMessage", &params).await?;
        Ok(message.to_ref())
    }

    async fn send_buttons(
        &self,
        conversation_id: &str,
        prompt: &str,
        options: &[ButtonOption],
    ) -> Result<MessageRef, GatewayError> {
        let params = json!({
            "chat_id": conversation_id,
            "text": prompt,
            "parse_mode": "HTML",
            "reply_markup": inline_keyboard_json(options),
        });
        let message: Message = self.call("sendMessage", &params).await?;
        Ok(message.to_ref())
    }

    async fn answer_selection(&self, selection_id: &str) -> Result<(), GatewayError> {
        let _: Value = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": selection_id }))
            .await?;
        Ok(())
    }

    async fn edit_message(&self, message: &MessageRef, text: &str) -> Result<(), GatewayError> {
        let params = json!({
            "chat_id": message.conversation_id,
            "message_id": message.message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        // Returns the edited message or `true`; neither is needed
        let _: Value = self.call("editMessageText", &params).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        conversation_id: &str,
        photo: &PhotoRef,
        caption: &str,
    ) -> Result<MessageRef, GatewayError> {
        let params = json!({
            "chat_id": conversation_id,
            "photo": photo.as_str(),
            "caption": caption,
            "parse_mode": "HTML",
        });
        let message: Message = self.call("sendPhoto", &params).await?;
        Ok(message.to_ref())
    }

    async fn resolve_photo(&self, upload: &PhotoUpload) -> Result<PhotoRef, GatewayError> {
        let variant = upload
            .largest()
            .ok_or_else(|| GatewayError::invalid_input("Photo upload has no variants"))?;

        // Confirms the file is still retrievable before it is stored
        let file: File = self
            .call("getFile", &json!({ "file_id": variant.file_id }))
            .await?;
        tracing::debug!(
            file_id = %file.file_id,
            width = variant.width,
            height = variant.height,
            has_path = file.file_path.is_some(),
            "Resolved photo"
        );
        Ok(PhotoRef(file.file_id))
    }
}

fn parse_response<R: DeserializeOwned>(
    method: &str,
    status: StatusCode,
    body: &str,
) -> Result<R, GatewayError> {
    let envelope: ApiResponse = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => {
            return Err(GatewayError::decode(format!("{method}: malformed response: {e}")));
        }
        Err(_) => return Err(classify_error(method, i64::from(status.as_u16()), body, None)),
    };

    if !envelope.ok {
        let code = envelope
            .error_code
            .unwrap_or_else(|| i64::from(status.as_u16()));
        let description = envelope.description.as_deref().unwrap_or("no description");
        let retry_after = envelope.parameters.and_then(|p| p.retry_after);
        return Err(classify_error(method, code, description, retry_after));
    }

    let result = envelope.result.unwrap_or(Value::Null);
    serde_json::from_value(result)
        .map_err(|e| GatewayError::decode(format!("{method}: unexpected result shape: {e}")))
}

fn classify_error(method: &str, code: i64, description: &str, retry_after: Option<u64>) -> GatewayError {
    match code {
        401 | 403 => GatewayError::auth(format!("{method}: {code} {description}")),
        429 => {
            let wait = retry_after.map_or_else(String::new, |s| format!(" (retry after {s}s)"));
            GatewayError::rate_limit(format!("{method}: {description}{wait}"))
        }
        500..=599 => GatewayError::network(format!("{method}: server error {code}: {description}")),
        _ => GatewayError::rejected(format!("{method}: {code} {description}")),
    }
}

fn markup_json(markup: &Markup) -> Value {
    match markup {
        // A single row, like the answer list it replaces
        Markup::ReplyKeyboard { options, one_time } => json!({
            "keyboard": [options.iter().map(|o| json!({ "text": o })).collect::<Vec<_>>()],
            "one_time_keyboard": one_time,
            "resize_keyboard": true,
        }),
        Markup::RemoveKeyboard => json!({ "remove_keyboard": true }),
    }
}

fn inline_keyboard_json(options: &[ButtonOption]) -> Value {
    let rows: Vec<Value> = options
        .iter()
        .map(|o| json!([{ "text": o.label, "callback_data": o.value }]))
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Map one update to a dialog event; `None` for anything the dialog does
/// not consume (edits, stickers, unknown commands, commands for other
/// bots, ...)
fn update_to_inbound(update: Update, bot_username: &str) -> Option<Inbound> {
    if let Some(query) = update.callback_query {
        let message = query.message?;
        return Some(Inbound {
            conversation_id: message.chat.id.to_string(),
            event: Event::Selection {
                value: query.data?,
                selection_id: query.id,
                message: message.to_ref(),
            },
        });
    }

    let message = update.message?;
    let conversation_id = message.chat.id.to_string();

    if let Some(photo) = message.photo {
        if photo.is_empty() {
            return None;
        }
        return Some(Inbound {
            conversation_id,
            event: Event::Photo {
                upload: PhotoUpload::new(photo),
            },
        });
    }

    let text = message.text?;
    let event = match text.strip_prefix('/') {
        Some(command) => parse_command(command, bot_username)?,
        None => Event::text(text),
    };
    Some(Inbound {
        conversation_id,
        event,
    })
}

/// `start`, `start@ThisBot` and `start payload` all name `/start`.
/// A command addressed to another bot with `@OtherBot` is not ours.
fn parse_command(command: &str, bot_username: &str) -> Option<Event> {
    let word = command.split_whitespace().next().unwrap_or_default();
    let (name, target) = word.split_once('@').unwrap_or((word, bot_username));
    // Telegram usernames are case-insensitive
    if !target.eq_ignore_ascii_case(bot_username) {
        return None;
    }
    match name {
        "start" => Some(Event::Start),
        "skip" => Some(Event::Skip),
        "cancel" => Some(Event::Cancel),
        _ => None,
    }
}

// Telegram Bot API types

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    photo: Option<Vec<PhotoVariant>>,
}

impl Message {
    fn to_ref(&self) -> MessageRef {
        MessageRef::new(self.chat.id.to_string(), self.message_id)
    }
}

#[derive(Debug, Deserialize)]
struct BotUser {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct File {
    file_id: String,
    #[serde(default)]
    file_path: Option<String>,
}
