mod model;

pub use model::{Capability, UserGroup, ensure_default_groups, resolve_capability};
pub use model::{MEMBER_GROUP, RESTRICTED_GROUP, VIP_GROUP};
