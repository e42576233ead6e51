use serde::{Deserialize, Serialize};

use crate::model::role::Role;

/// The authenticated caller, as resolved by the identity layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: u64, role: Role) -> Self {
        Self { user_id, role }
    }
}
