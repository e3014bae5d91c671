//! 对话回复的来源。目前只有固定文案的占位实现。

use futures_util::future::{BoxFuture, FutureExt};

use crate::error::AppResult;
use crate::i18n::Lang;

use super::model::{ChatConfig, ChatMessage};

pub trait ChatProvider: Send + Sync {
    /// `history` 按时间顺序排列，最后一条是本次用户输入
    fn reply<'a>(
        &'a self,
        config: &'a ChatConfig,
        history: &'a [ChatMessage],
        lang: Lang,
    ) -> BoxFuture<'a, AppResult<String>>;
}

/// 无论配置如何都返回同一段提示
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderProvider;

impl ChatProvider for PlaceholderProvider {
    fn reply<'a>(
        &'a self,
        config: &'a ChatConfig,
        history: &'a [ChatMessage],
        lang: Lang,
    ) -> BoxFuture<'a, AppResult<String>> {
        async move {
            tracing::debug!(
                "Placeholder reply for {} ({} messages in history)",
                config.api_type,
                history.len()
            );
            Ok(lang.text("placeholder_reply").to_string())
        }
        .boxed()
    }
}
