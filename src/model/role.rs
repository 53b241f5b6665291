#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            _ => None,
        }
    }

    /// Numeric access level carried by the role id (1 = unrestricted admin,
    /// <= 2 = HR tier).
    pub fn access_level(&self) -> u8 {
        *self as u8
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn is_hr_tier(&self) -> bool {
        self.access_level() <= 2
    }
}
