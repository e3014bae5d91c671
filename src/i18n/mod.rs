//! 静态多语言文案表，语言由 `lang` Cookie 决定。

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use crate::{AppState, utils::cookie};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Zh,
    En,
}

impl Lang {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "zh" => Some(Lang::Zh),
            "en" => Some(Lang::En),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Lang::Zh => "zh",
            Lang::En => "en",
        }
    }

    pub fn text(self, key: &str) -> &str {
        get_text(self, key)
    }
}

impl FromRequestParts<AppState> for Lang {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let lang = cookie::read(&parts.headers, cookie::LANG_COOKIE)
            .and_then(|code| Lang::parse(&code))
            .or_else(|| Lang::parse(&state.config.default_language))
            .unwrap_or(Lang::Zh);
        Ok(lang)
    }
}

/// 查找文案，未收录的键原样返回
pub fn get_text(lang: Lang, key: &str) -> &str {
    let table = match lang {
        Lang::Zh => ZH,
        Lang::En => EN,
    };
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or(key)
}

const ZH: &[(&str, &str)] = &[
    ("login", "登录"),
    ("register", "注册"),
    ("login_success", "登录成功！"),
    ("login_failed", "用户名或密码错误"),
    ("logout_success", "您已退出登录"),
    ("register_success", "注册成功，请登录"),
    ("user_exists", "用户名或邮箱已被使用"),
    ("invalid_registration", "请填写有效的用户名、邮箱和密码"),
    ("permission_denied", "您没有权限执行此操作"),
    ("account_settings", "账户设置"),
    ("profile_update_success", "个人资料已更新"),
    ("invalid_email", "请输入有效的邮箱地址"),
    ("email_taken", "该邮箱已被使用"),
    ("wrong_password", "当前密码错误"),
    ("password_mismatch", "两次输入的密码不一致"),
    ("password_too_short", "密码长度至少为6个字符"),
    ("password_update_success", "密码已更新"),
    ("notifications_update_success", "通知设置已更新"),
    ("knowledge_base", "知识库"),
    ("new_article", "发布文章"),
    ("edit_article", "编辑文章"),
    ("article_created", "文章发布成功"),
    ("article_updated", "文章更新成功"),
    ("article_deleted", "文章已删除"),
    ("article_invalid", "标题和内容不能为空，标题不超过200个字符"),
    ("comment_created", "评论发表成功"),
    ("empty_comment", "评论内容不能为空"),
    ("admin_panel", "管理后台"),
    ("user_management", "用户管理"),
    ("article_management", "文章管理"),
    ("about_us", "关于我们"),
    ("search_results", "搜索结果"),
    ("chat", "智能问答"),
    ("new_conversation", "新对话"),
    ("missing_params", "缺少必要参数"),
    ("no_conversation_access", "无权访问此对话"),
    ("no_conversation_delete", "无权删除此对话"),
    ("configure_api_first", "请先配置API设置"),
    ("placeholder_reply", "这是一个示例回复。实际使用时需要实现与AI API的交互。"),
];

const EN: &[(&str, &str)] = &[
    ("login", "Log in"),
    ("register", "Register"),
    ("login_success", "Logged in successfully!"),
    ("login_failed", "Invalid username or password"),
    ("logout_success", "You have been logged out"),
    ("register_success", "Registration successful, please log in"),
    ("user_exists", "Username or email already in use"),
    ("invalid_registration", "Please provide a valid username, email and password"),
    ("permission_denied", "You do not have permission to perform this action"),
    ("account_settings", "Account Settings"),
    ("profile_update_success", "Profile updated"),
    ("invalid_email", "Please enter a valid email address"),
    ("email_taken", "This email is already in use"),
    ("wrong_password", "Current password is incorrect"),
    ("password_mismatch", "Passwords do not match"),
    ("password_too_short", "Password must be at least 6 characters"),
    ("password_update_success", "Password updated"),
    ("notifications_update_success", "Notification settings updated"),
    ("knowledge_base", "Knowledge Base"),
    ("new_article", "New Article"),
    ("edit_article", "Edit Article"),
    ("article_created", "Article published"),
    ("article_updated", "Article updated"),
    ("article_deleted", "Article deleted"),
    ("article_invalid", "Title and content are required; titles are limited to 200 characters"),
    ("comment_created", "Comment posted"),
    ("empty_comment", "Comment cannot be empty"),
    ("admin_panel", "Admin Panel"),
    ("user_management", "User Management"),
    ("article_management", "Article Management"),
    ("about_us", "About Us"),
    ("search_results", "Search Results"),
    ("chat", "AI Assistant"),
    ("new_conversation", "New conversation"),
    ("missing_params", "Missing required parameters"),
    ("no_conversation_access", "You cannot access this conversation"),
    ("no_conversation_delete", "You cannot delete this conversation"),
    ("configure_api_first", "Please configure your API settings first"),
    (
        "placeholder_reply",
        "This is a sample reply. A real AI API integration is required for actual answers.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_are_translated() {
        assert_eq!(get_text(Lang::Zh, "login_failed"), "用户名或密码错误");
        assert_eq!(get_text(Lang::En, "login_failed"), "Invalid username or password");
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        assert_eq!(get_text(Lang::En, "no_such_key"), "no_such_key");
    }

    #[test]
    fn both_tables_cover_the_same_keys() {
        for (key, _) in ZH {
            assert!(EN.iter().any(|(k, _)| k == key), "missing en text for {key}");
        }
        assert_eq!(ZH.len(), EN.len());
    }

    #[test]
    fn only_supported_codes_parse() {
        assert_eq!(Lang::parse("en"), Some(Lang::En));
        assert_eq!(Lang::parse("zh"), Some(Lang::Zh));
        assert_eq!(Lang::parse("fr"), None);
    }
}
