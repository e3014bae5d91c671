mod handler;
mod model;

pub use handler::{about_page, manage_about, save_about};
pub use model::{AboutSection, SectionInput, default_sections};
