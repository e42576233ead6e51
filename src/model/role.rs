use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Roles carried in the access token. The wire names match the user
/// administration screens ("HR Officer", "Master Admin", ...).
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    ToSchema,
)]
pub enum Role {
    #[strum(serialize = "Admin")]
    #[serde(rename = "Admin")]
    Admin = 1,
    #[strum(serialize = "HR Officer")]
    #[serde(rename = "HR Officer")]
    HrOfficer = 2,
    #[strum(serialize = "Finance Officer")]
    #[serde(rename = "Finance Officer")]
    FinanceOfficer = 3,
    #[strum(serialize = "Viewer")]
    #[serde(rename = "Viewer")]
    Viewer = 4,
    #[strum(serialize = "Master")]
    #[serde(rename = "Master")]
    Master = 5,
    #[strum(serialize = "Master Admin")]
    #[serde(rename = "Master Admin")]
    MasterAdmin = 6,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::HrOfficer),
            3 => Some(Role::FinanceOfficer),
            4 => Some(Role::Viewer),
            5 => Some(Role::Master),
            6 => Some(Role::MasterAdmin),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    pub fn is_hr(self) -> bool {
        self == Role::HrOfficer
    }

    /// Override tier: may rewrite or delete any request.
    pub fn is_master(self) -> bool {
        matches!(self, Role::Master | Role::MasterAdmin)
    }

    /// Self-service tier: only ever acts on its own employee record.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Viewer | Role::FinanceOfficer)
    }
}
