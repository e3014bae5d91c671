mod auth;
mod error_handler;
mod flash;
mod rate_limit;

pub use auth::{Capabilities, CurrentUser, OptionalUser, auth_middleware, resolve_session, safe_next};
pub use error_handler::log_errors;
pub use flash::{
    Flash, FlashKind, FlashMessage, FlashView, flash_middleware, flash_redirect, flash_redirect_with,
};
pub use rate_limit::{RateLimiter, rate_limit};
