use serde::{Deserialize, Serialize};

/// Authorization role attached to a user account.
///
/// The set is closed: the surrounding application gates routes on these three
/// values and nothing else. Administrators may do everything a supervisor can,
/// and supervisors everything an operator can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Supervisor,
    Operator,
}

impl Role {
    /// Whether a caller holding this role satisfies the `required` level.
    pub fn allows(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    fn rank(self) -> u8 {
        match self {
            Role::Administrator => 2,
            Role::Supervisor => 1,
            Role::Operator => 0,
        }
    }

    /// Parses the wire/sheet representation of a role.
    pub fn parse(input: &str) -> Option<Role> {
        match input.trim().to_ascii_lowercase().as_str() {
            "administrator" | "administrador" => Some(Role::Administrator),
            "supervisor" => Some(Role::Supervisor),
            "operator" | "operario" => Some(Role::Operator),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Administrator => "administrator",
            Role::Supervisor => "supervisor",
            Role::Operator => "operator",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::Administrator.allows(Role::Supervisor));
        assert!(Role::Administrator.allows(Role::Operator));
        assert!(Role::Supervisor.allows(Role::Operator));
        assert!(!Role::Supervisor.allows(Role::Administrator));
        assert!(!Role::Operator.allows(Role::Supervisor));
    }

    #[test]
    fn test_parse_accepts_legacy_spanish_names() {
        assert_eq!(Role::parse("Administrador"), Some(Role::Administrator));
        assert_eq!(Role::parse("Operario"), Some(Role::Operator));
        assert_eq!(Role::parse("supervisor"), Some(Role::Supervisor));
        assert_eq!(Role::parse("guest"), None);
    }
}
