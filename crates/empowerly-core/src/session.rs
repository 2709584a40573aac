use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage key for the serialized user profile
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Hr,
    Employee,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Hr => "HR",
            Self::Employee => "EMPLOYEE",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    Finance,
    Hr,
    Backend,
    Frontend,
    Devops,
}

/// Profile of the signed-in user, persisted under [`USER_KEY`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<Department>,
}

/// Body of a successful sign-in response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "type", default = "default_token_type")]
    pub token_type: String,
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_token_type() -> String {
    String::from("Bearer")
}

impl AuthResponse {
    /// Project the response onto the profile fields that get persisted
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            department: self.department,
        }
    }
}

/// A signed-in user: token and profile always travel together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

impl Session {
    /// Build a session from a sign-in response
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the token or user id is blank
    pub fn from_response(response: &AuthResponse) -> Result<Self, AuthError> {
        if response.token.trim().is_empty() {
            return Err(AuthError::InvalidCredentials(String::from(
                "response carries no token",
            )));
        }
        if response.id.trim().is_empty() {
            return Err(AuthError::InvalidCredentials(String::from(
                "response carries no user id",
            )));
        }
        Ok(Self {
            token: response.token.clone(),
            user: response.profile(),
        })
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogoutReason {
    /// The user signed out
    Manual,
    /// The inactivity timeout elapsed
    Inactivity,
    /// The backend rejected the token
    Unauthorized,
}

impl LogoutReason {
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Manual => "signed out",
            Self::Inactivity => "expired after inactivity",
            Self::Unauthorized => "rejected by server",
        }
    }
}

/// Outcome of a guarded-route check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No session; send the user to sign-in
    SignInRequired,
    /// Signed in, but the role is not allowed here
    Forbidden,
    Granted,
}
