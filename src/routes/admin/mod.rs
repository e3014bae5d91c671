mod handler;

pub use handler::{admin_articles, admin_index, admin_users};
