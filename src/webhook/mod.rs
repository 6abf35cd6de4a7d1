//! HTTP surface: Telegram webhook, health and home routes.

pub mod reply;
pub mod update;

pub use reply::{ItemOutcome, format_reply};
pub use update::Update;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::categorize::Categorizer;
use crate::channels::Channel;
use crate::config::{BotConfig, ClassifierMode};
use crate::routing::RoutingTable;
use crate::store::DocumentStore;

/// Header Telegram echoes the registered secret in.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared, read-only state behind every request.
pub struct BotState {
    pub categorizer: Categorizer,
    pub routing: RoutingTable,
    pub store: Arc<dyn DocumentStore>,
    pub channel: Arc<dyn Channel>,
    pub authorized_chat_id: i64,
    pub webhook_secret: Option<SecretString>,
}

/// What a single update led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a text message; nothing done.
    Ignored,
    /// Sender is not the authorized chat; denial sent.
    Unauthorized,
    /// A `/command`; answered without classifying.
    Command,
    /// Classified and written; `written` of `total` items succeeded.
    Processed { written: usize, total: usize },
}

impl BotState {
    pub fn new(
        config: &BotConfig,
        categorizer: Categorizer,
        store: Arc<dyn DocumentStore>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            categorizer,
            routing: config.routing.clone(),
            store,
            channel,
            authorized_chat_id: config.telegram.authorized_chat_id,
            webhook_secret: config.telegram.webhook_secret.clone(),
        }
    }

    /// Run one update through authorization, classification, writes and reply.
    pub async fn handle_update(&self, update: &Update) -> WebhookOutcome {
        let Some((chat_id, text)) = update.text_message() else {
            debug!(update_id = ?update.update_id, "Ignoring update without text");
            return WebhookOutcome::Ignored;
        };

        if chat_id != self.authorized_chat_id {
            info!(chat_id, "Rejected message from unauthorized chat");
            self.reply(chat_id, reply::UNAUTHORIZED_REPLY).await;
            return WebhookOutcome::Unauthorized;
        }

        if text.starts_with('/') {
            self.handle_command(chat_id, text).await;
            return WebhookOutcome::Command;
        }

        let result = self.categorizer.classify(text).await;
        info!(
            chat_id,
            items = result.len(),
            source = result.source().as_str(),
            "Message classified"
        );

        let mut outcomes = Vec::with_capacity(result.len());
        for item in result.into_items() {
            let destination = self.routing.destination_for(item.category);
            let written = match self.store.write(destination, &item).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        store = self.store.name(),
                        category = item.category.as_str(),
                        destination,
                        error = %e,
                        "Failed to write item"
                    );
                    false
                }
            };
            outcomes.push(ItemOutcome { item, written });
        }

        let written = outcomes.iter().filter(|o| o.written).count();
        let total = outcomes.len();
        info!(chat_id, written, total, "Message processed");

        self.reply(chat_id, &format_reply(&outcomes, self.categorizer.mode()))
            .await;
        WebhookOutcome::Processed { written, total }
    }

    async fn handle_command(&self, chat_id: i64, text: &str) {
        // "/start@SomeBot args" → "/start"
        let command = text
            .split_whitespace()
            .next()
            .unwrap_or(text)
            .split('@')
            .next()
            .unwrap_or(text)
            .to_lowercase();
        debug!(chat_id, command = %command, "Command received");

        let response = match command.as_str() {
            "/start" | "/help" => reply::usage_text(self.categorizer.llm_provider()),
            _ => reply::unknown_command_text(&command),
        };
        self.reply(chat_id, &response).await;
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.channel.send_message(chat_id, text).await {
            warn!(chat_id, channel = self.channel.name(), error = %e, "Failed to send reply");
        }
    }

    fn secret_matches(&self, headers: &HeaderMap) -> bool {
        match &self.webhook_secret {
            None => true,
            Some(expected) => headers
                .get(SECRET_HEADER)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|provided| {
                    secret_eq(provided.as_bytes(), expected.expose_secret().as_bytes())
                }),
        }
    }

    fn home_text(&self) -> String {
        match self.categorizer.llm_provider() {
            Some(provider) => format!(
                "Brain Dump Bot is running with {}!",
                reply::engine_label(Some(provider))
            ),
            None => "Brain Dump Bot is running in basic mode 📊!".to_string(),
        }
    }
}

/// Byte comparison whose running time does not depend on where the inputs
/// first differ. Length is not hidden.
fn secret_eq(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Build the Axum router with webhook, health and home routes.
pub fn routes(state: Arc<BotState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn webhook(
    State(state): State<Arc<BotState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.secret_matches(&headers) {
        warn!("Webhook request with missing or wrong secret token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"status": "unauthorized"})),
        )
            .into_response();
    }

    let request_id = Uuid::new_v4();
    let outcome = async {
        match serde_json::from_slice::<Update>(&body) {
            Ok(update) => state.handle_update(&update).await,
            Err(e) => {
                debug!(error = %e, "Ignoring undecodable webhook body");
                WebhookOutcome::Ignored
            }
        }
    }
    .instrument(info_span!("webhook", %request_id))
    .await;

    let status = match outcome {
        WebhookOutcome::Unauthorized => "unauthorized",
        _ => "ok",
    };
    Json(serde_json::json!({ "status": status })).into_response()
}

async fn health(State(state): State<Arc<BotState>>) -> impl IntoResponse {
    let mode = state.categorizer.mode();
    Json(serde_json::json!({
        "status": "healthy",
        "classifier_mode": mode.as_str(),
        "llm_available": mode == ClassifierMode::LlmWithFallback,
        "llm_provider": state.categorizer.llm_provider(),
        "notion_configured": state.store.is_configured(),
        "telegram_configured": state.channel.is_configured(),
    }))
}

async fn home(State(state): State<Arc<BotState>>) -> impl IntoResponse {
    state.home_text()
}
