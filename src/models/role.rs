use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller role, carried on the wire as its numeric id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum Role {
    Administrator,
    StationOperator,
}

impl Role {
    pub fn id(&self) -> u8 {
        match self {
            Role::Administrator => 1,
            Role::StationOperator => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::StationOperator => "station_operator",
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Role::Administrator),
            2 => Ok(Role::StationOperator),
            other => Err(format!("unknown role id: {other}")),
        }
    }
}

impl From<Role> for u8 {
    fn from(role: Role) -> Self {
        role.id()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ids() {
        assert_eq!(serde_json::to_string(&Role::Administrator).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Role::StationOperator).unwrap(), "2");
        let role: Role = serde_json::from_str("2").unwrap();
        assert_eq!(role, Role::StationOperator);
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(serde_json::from_str::<Role>("3").is_err());
        assert!(Role::try_from(0).is_err());
    }
}
