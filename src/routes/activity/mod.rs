mod model;

pub use model::{Activity, actions};
