use std::fmt;

use serde::Serialize;

/// The two backend namespaces. Kind only selects the URL segment and
/// registry namespace; routing inside a kind uses the capability type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Actor,
    Driver,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 2] = [CapabilityKind::Actor, CapabilityKind::Driver];

    /// URL path segment and log-category component.
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityKind::Actor => "actor",
            CapabilityKind::Driver => "driver",
        }
    }

    /// Capitalized form used in session log messages.
    pub fn title(self) -> &'static str {
        match self {
            CapabilityKind::Actor => "Actor",
            CapabilityKind::Driver => "Driver",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings() {
        assert_eq!(CapabilityKind::Actor.to_string(), "actor");
        assert_eq!(CapabilityKind::Driver.as_str(), "driver");
        assert_eq!(CapabilityKind::Driver.title(), "Driver");
        assert_eq!(
            serde_json::to_value(CapabilityKind::Actor).unwrap(),
            serde_json::json!("actor")
        );
    }
}
