use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse privilege tier of a user, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum PrivilegeTier {
    #[default]
    User,
    Voice,
    Operator,
    Owner,
}

/// Identity of the user an event originated from, with resolved privileges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub nick: String,
    pub hostmask: Option<String>,
    pub tier: PrivilegeTier,
    pub level: u16,
}

impl Sender {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            hostmask: None,
            tier: PrivilegeTier::User,
            level: 0,
        }
    }

    pub fn with_hostmask(mut self, hostmask: impl Into<String>) -> Self {
        self.hostmask = Some(hostmask.into());
        self
    }

    pub fn with_tier(mut self, tier: PrivilegeTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_level(mut self, level: u16) -> Self {
        self.level = level;
        self
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nick)
    }
}

/// Permission gate attached to a handler at registration time and evaluated
/// against the sender at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionRequirement {
    /// Sender must hold at least this tier.
    Tier(PrivilegeTier),
    /// Sender's numeric level must be at least this.
    MinLevel(u16),
}

impl PermissionRequirement {
    pub fn met_by(&self, sender: &Sender) -> bool {
        match self {
            PermissionRequirement::Tier(tier) => sender.tier >= *tier,
            PermissionRequirement::MinLevel(level) => sender.level >= *level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_requirement_is_inclusive() {
        let op = Sender::new("alice").with_tier(PrivilegeTier::Operator);
        assert!(PermissionRequirement::Tier(PrivilegeTier::Operator).met_by(&op));
        assert!(PermissionRequirement::Tier(PrivilegeTier::Voice).met_by(&op));
        assert!(!PermissionRequirement::Tier(PrivilegeTier::Owner).met_by(&op));
    }

    #[test]
    fn level_requirement_compares_numerically() {
        let user = Sender::new("bob").with_level(50);
        assert!(PermissionRequirement::MinLevel(50).met_by(&user));
        assert!(!PermissionRequirement::MinLevel(51).met_by(&user));
    }
}
