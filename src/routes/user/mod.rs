mod handler;
mod model;

pub use handler::{
    account, login, login_page, logout, register, update_notifications, update_password,
    update_profile,
};
pub use model::{MIN_PASSWORD_LEN, NewUser, User, is_valid_email, is_valid_username};
