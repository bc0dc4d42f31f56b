use serde::{Deserialize, Serialize};

/// A participant's role within a room.
///
/// The wire representation matches the capitalized names clients send and
/// receive, so the derived serde impls are used for protocol payloads too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Host,
    Moderator,
    Participant,
}

impl Role {
    /// Playback control is open to hosts and moderators.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Host | Role::Moderator)
    }

    /// Role assignment and participant removal are host-only.
    pub fn is_host(&self) -> bool {
        matches!(self, Role::Host)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "Host",
            Role::Moderator => "Moderator",
            Role::Participant => "Participant",
        }
    }

    /// Parses a stored role string. `None` means the store holds a value
    /// this build doesn't know about.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Host" => Some(Role::Host),
            "Moderator" => Some(Role::Moderator),
            "Participant" => Some(Role::Participant),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_predicates() {
        assert!(Role::Host.is_privileged());
        assert!(Role::Moderator.is_privileged());
        assert!(!Role::Participant.is_privileged());

        assert!(Role::Host.is_host());
        assert!(!Role::Moderator.is_host());
        assert!(!Role::Participant.is_host());
    }

    #[test]
    fn round_trips_stored_strings() {
        for role in [Role::Host, Role::Moderator, Role::Participant] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }

        assert_eq!(Role::parse("host"), None);
        assert_eq!(Role::parse("Admin"), None);
    }

    #[test]
    fn serializes_as_capitalized_string() {
        let json = serde_json::to_string(&Role::Moderator).unwrap();
        assert_eq!(json, "\"Moderator\"");
    }
}
