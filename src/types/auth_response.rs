use serde::{Deserialize, Serialize};

use crate::types::SessionToken;

/// Body returned by `GET /auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The freshly issued session token.
    pub token: SessionToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialization() {
        let response: AuthResponse = serde_json::from_value(json!({"token": "abc"})).unwrap();
        assert_eq!(response.token.as_str(), "abc");
    }
}
