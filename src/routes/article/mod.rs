mod handler;
mod model;

pub use handler::{
    create_article, create_comment, delete_article, edit_article_form, index, knowledge,
    list_articles, new_article_form, search, update_article, view_article,
};
pub use model::{
    Article, ArticleForm, ArticleView, Comment, KNOWLEDGE_PAGE_SIZE, normalize_tags, split_tags,
};
