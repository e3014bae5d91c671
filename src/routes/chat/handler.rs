use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{
    AppState,
    error::{AppError, AppResult},
    i18n::Lang,
    middleware::CurrentUser,
    routes::group::Capability,
    utils::{ApiResponse, into_api_response, success_to_api_response},
};

use super::model::{
    ChatConfig, ChatConfigRequest, ChatConfigView, ChatMessage, Conversation,
    CreateConversationRequest, SendMessageRequest,
};

#[derive(Debug, Serialize)]
pub struct ChatPage {
    pub title: String,
    pub conversations: Vec<Conversation>,
    pub config: Option<ChatConfigView>,
    pub can_use_ai: bool,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: Conversation,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ReplyMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub message: ReplyMessage,
}

#[derive(Debug, Serialize)]
pub struct Saved {}

/// 读取属于当前用户的对话
async fn owned_conversation(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    lang: Lang,
    denied_key: &str,
) -> AppResult<Conversation> {
    let conversation = Conversation::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound)?;
    if conversation.user_id != user.id() {
        return Err(AppError::Denied(lang.text(denied_key).to_string()));
    }
    Ok(conversation)
}

#[axum::debug_handler(state = AppState)]
pub async fn chat_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    lang: Lang,
) -> AppResult<Json<ApiResponse<ChatPage>>> {
    let conversations = Conversation::list_for_user(&state.pool, user.id()).await?;
    let config = ChatConfig::find_for_user(&state.pool, user.id()).await?;

    Ok(success_to_api_response(ChatPage {
        title: lang.text("chat").to_string(),
        conversations,
        config: config.as_ref().map(ChatConfig::to_view),
        can_use_ai: user.can(Capability::UseAi),
    }))
}

#[axum::debug_handler(state = AppState)]
pub async fn update_config(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ChatConfigRequest>,
) -> Json<ApiResponse<Saved>> {
    let result = ChatConfig::upsert(&state.pool, user.id(), req)
        .await
        .map(|_| Saved {})
        .map_err(AppError::from);
    into_api_response(result)
}

#[axum::debug_handler(state = AppState)]
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Json<ApiResponse<ConversationsResponse>> {
    let result = Conversation::list_for_user(&state.pool, user.id())
        .await
        .map(|conversations| ConversationsResponse { conversations })
        .map_err(AppError::from);
    into_api_response(result)
}

#[axum::debug_handler(state = AppState)]
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    lang: Lang,
    Json(req): Json<CreateConversationRequest>,
) -> Json<ApiResponse<ConversationResponse>> {
    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| lang.text("new_conversation").to_string());

    let result = Conversation::create(&state.pool, user.id(), &title)
        .await
        .map(|conversation| ConversationResponse { conversation })
        .map_err(AppError::from);
    into_api_response(result)
}

async fn delete_conversation_inner(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    lang: Lang,
) -> AppResult<Saved> {
    owned_conversation(state, user, id, lang, "no_conversation_delete").await?;
    Conversation::delete(&state.pool, id).await?;
    tracing::info!("User {} deleted conversation {}", user.id(), id);
    Ok(Saved {})
}

#[axum::debug_handler(state = AppState)]
pub async fn delete_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    lang: Lang,
) -> Json<ApiResponse<Saved>> {
    into_api_response(delete_conversation_inner(&state, &user, id, lang).await)
}

async fn list_messages_inner(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    lang: Lang,
) -> AppResult<MessagesResponse> {
    owned_conversation(state, user, id, lang, "no_conversation_access").await?;
    let messages = ChatMessage::list_for_conversation(&state.pool, id).await?;
    Ok(MessagesResponse { messages })
}

#[axum::debug_handler(state = AppState)]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    lang: Lang,
) -> Json<ApiResponse<MessagesResponse>> {
    into_api_response(list_messages_inner(&state, &user, id, lang).await)
}

async fn send_message_inner(
    state: &AppState,
    user: &CurrentUser,
    lang: Lang,
    req: SendMessageRequest,
) -> AppResult<ReplyResponse> {
    let content = req.content.as_deref().map(str::trim).unwrap_or_default();
    let Some(conversation_id) = req.conversation_id.filter(|_| !content.is_empty()) else {
        return Err(AppError::Validation(lang.text("missing_params").to_string()));
    };

    owned_conversation(state, user, conversation_id, lang, "no_conversation_access").await?;

    if !user.can(Capability::UseAi) {
        return Err(AppError::Denied(lang.text("permission_denied").to_string()));
    }

    let config = match ChatConfig::find_for_user(&state.pool, user.id()).await? {
        Some(config) if config.has_api_key() => config,
        _ => return Err(AppError::Validation(lang.text("configure_api_first").to_string())),
    };

    let mut history = ChatMessage::list_for_conversation(&state.pool, conversation_id).await?;
    history.push(ChatMessage::pending_user(conversation_id, content));

    let reply = state.chat_provider.reply(&config, &history, lang).await?;
    let saved = Conversation::append_exchange(&state.pool, conversation_id, content, &reply).await?;

    Ok(ReplyResponse {
        message: ReplyMessage {
            role: saved.role,
            content: saved.content,
        },
    })
}

#[axum::debug_handler(state = AppState)]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    lang: Lang,
    Json(req): Json<SendMessageRequest>,
) -> Json<ApiResponse<ReplyResponse>> {
    into_api_response(send_message_inner(&state, &user, lang, req).await)
}
