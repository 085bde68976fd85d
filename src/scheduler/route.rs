//! Route classification.

use std::fmt;
use std::str::FromStr;
use std::convert::Infallible;
use serde::{Deserialize, Serialize};

/// Token the caller passes for the application's base path.
pub const ROOT_TOKEN: &str = "/";
/// Token the caller passes for the realtime / long-poll channel.
pub const WEBSOCKET_TOKEN: &str = "ws";

/// Which admission rule applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// The application's base path. Opens new sessions.
    Root,
    /// Realtime channel upgrade.
    WebSocket,
    /// Anything else; piggybacks on an admitted session.
    Other,
}

impl RouteClass {
    /// Classify a caller-supplied route token. Only `"/"` and `"ws"` are reserved.
    pub fn classify(token: &str) -> Self {
        match token {
            ROOT_TOKEN => RouteClass::Root,
            WEBSOCKET_TOKEN => RouteClass::WebSocket,
            _ => RouteClass::Other,
        }
    }

    /// Whether the app's request ceiling is enforced for this class.
    pub fn is_admission_controlled(self) -> bool {
        matches!(self, RouteClass::Root | RouteClass::WebSocket)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteClass::Root => "root",
            RouteClass::WebSocket => "websocket",
            RouteClass::Other => "other",
        }
    }
}

impl FromStr for RouteClass {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::classify(s))
    }
}

impl From<&str> for RouteClass {
    fn from(token: &str) -> Self {
        Self::classify(token)
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reserved_tokens() {
        assert_eq!(RouteClass::classify("/"), RouteClass::Root);
        assert_eq!(RouteClass::classify("ws"), RouteClass::WebSocket);
        assert_eq!(RouteClass::classify("SOMEURL"), RouteClass::Other);
        assert_eq!(RouteClass::classify("/assets/app.js"), RouteClass::Other);
        assert_eq!(RouteClass::classify(""), RouteClass::Other);
        assert_eq!("ws".parse::<RouteClass>().unwrap(), RouteClass::WebSocket);
    }

    #[test]
    fn test_admission_controlled() {
        assert!(RouteClass::Root.is_admission_controlled());
        assert!(RouteClass::WebSocket.is_admission_controlled());
        assert!(!RouteClass::Other.is_admission_controlled());
    }
}
