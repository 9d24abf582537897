use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The authenticated identity held by the client.
///
/// Only `token` is required. Profile fields are omitted from the
/// serialized form when absent, and any other field the server sent is
/// kept in `extra`, so the stored document matches the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            first_name: None,
            last_name: None,
            email: None,
            extra: Map::new(),
        }
    }

    /// A session without a token is not a session
    pub fn is_valid(&self) -> bool {
        !self.token.trim().is_empty()
    }

    /// Name for display: "First Last", falling back to email
    pub fn display_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            Some(name)
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    #[serde(rename = "username")]
    pub identifier: String,
    #[serde(rename = "password")]
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

/// Registration request body
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    #[serde(rename = "username")]
    pub identifier: String,
    #[serde(rename = "password")]
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Registration {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
            email: None,
            first_name: None,
            last_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_omits_absent_profile_fields() {
        let session = Session::new("tok-1");
        assert_eq!(serde_json::to_value(&session).unwrap(), json!({"token": "tok-1"}));

        let parsed: Session = serde_json::from_value(json!({"token": "tok-1"})).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn test_session_profile_fields() {
        let parsed: Session = serde_json::from_value(json!({
            "token": "tok-2",
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane@doe.com",
            "id": 7
        }))
        .unwrap();
        assert_eq!(parsed.display_name().as_deref(), Some("Jane Doe"));
        assert_eq!(parsed.extra.get("id"), Some(&json!(7)));
        assert!(parsed.is_valid());
    }

    #[test]
    fn test_response_body_round_trips_unchanged() {
        let body = json!({"id": 7, "token": "tok-1", "username": "jane", "groups": ["tenant"]});
        let session: Session = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(serde_json::to_value(&session).unwrap(), body);
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut session = Session::new("tok");
        assert_eq!(session.display_name(), None);
        session.email = Some("jane@doe.com".to_string());
        assert_eq!(session.display_name().as_deref(), Some("jane@doe.com"));
    }

    #[test]
    fn test_blank_token_is_invalid() {
        assert!(!Session::new("").is_valid());
        assert!(!Session::new("   ").is_valid());
    }

    #[test]
    fn test_request_bodies_use_django_field_names() {
        let credentials = Credentials::new("jane@doe.com", "password");
        assert_eq!(
            serde_json::to_value(&credentials).unwrap(),
            json!({"username": "jane@doe.com", "password": "password"})
        );

        let mut registration = Registration::new("jane@doe.com", "password");
        registration.email = Some("jane@doe.com".to_string());
        assert_eq!(
            serde_json::to_value(&registration).unwrap(),
            json!({"username": "jane@doe.com", "password": "password", "email": "jane@doe.com"})
        );
    }
}
