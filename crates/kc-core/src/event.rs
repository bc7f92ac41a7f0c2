//! Event model for Keycloak Rust.
//!
//! ## NIST 800-53 Rev5: AU-2 (Event Logging)
//!
//! The host emits two kinds of security-relevant events:
//! - [`UserEvent`] for actions performed by or against an end user
//!   (login, logout, registration, token refresh, ...)
//! - [`AdminEvent`] for actions performed through the admin API
//!
//! ## NIST 800-53 Rev5: AU-3 (Content of Audit Records)
//!
//! All events include:
//! - Timestamp (serialized as epoch milliseconds)
//! - Event or operation type
//! - Identity of the subject or actor (when available)
//! - Source IP (when available)
//! - Affected resources (admin events)
//!
//! Serialized field names follow the host's JSON representation
//! (`camelCase`, `type` for the user event kind).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of a user event.
///
/// Closed set defined by the host. The serialized form and [`EventType::as_str`]
/// are the host's names (`LOGIN`, `CODE_TO_TOKEN_ERROR`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Authentication events
    /// User login.
    Login,
    /// User login failed.
    LoginError,
    /// Client authenticated with its own credentials.
    ClientLogin,
    /// Client authentication failed.
    ClientLoginError,
    /// User logout.
    Logout,
    /// User logout failed.
    LogoutError,
    /// User logged in through an identity provider.
    IdentityProviderLogin,
    /// Identity provider login failed.
    IdentityProviderLoginError,

    // Token events
    /// Authorization code exchanged for tokens.
    CodeToToken,
    /// Code exchange failed.
    CodeToTokenError,
    /// Token refresh.
    RefreshToken,
    /// Token refresh failed.
    RefreshTokenError,
    /// Token introspected.
    IntrospectToken,
    /// Token introspection failed.
    IntrospectTokenError,
    /// Token exchanged.
    TokenExchange,
    /// Token exchange failed.
    TokenExchangeError,
    /// Grant revoked.
    RevokeGrant,

    // Account events
    /// User registered.
    Register,
    /// User registration failed.
    RegisterError,
    /// Profile updated.
    UpdateProfile,
    /// Profile update failed.
    UpdateProfileError,
    /// Password updated.
    UpdatePassword,
    /// Password update failed.
    UpdatePasswordError,
    /// Email updated.
    UpdateEmail,
    /// Email verified.
    VerifyEmail,
    /// Verification email sent.
    SendVerifyEmail,
    /// Password reset email sent.
    SendResetPassword,
    /// Password reset.
    ResetPassword,
    /// Password reset failed.
    ResetPasswordError,
    /// OTP credential configured.
    UpdateTotp,
    /// OTP credential removed.
    RemoveTotp,
    /// Account deleted by the user.
    DeleteAccount,
    /// Account deletion failed.
    DeleteAccountError,
    /// Custom required action completed.
    CustomRequiredAction,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::Login,
        Self::LoginError,
        Self::ClientLogin,
        Self::ClientLoginError,
        Self::Logout,
        Self::LogoutError,
        Self::IdentityProviderLogin,
        Self::IdentityProviderLoginError,
        Self::CodeToToken,
        Self::CodeToTokenError,
        Self::RefreshToken,
        Self::RefreshTokenError,
        Self::IntrospectToken,
        Self::IntrospectTokenError,
        Self::TokenExchange,
        Self::TokenExchangeError,
        Self::RevokeGrant,
        Self::Register,
        Self::RegisterError,
        Self::UpdateProfile,
        Self::UpdateProfileError,
        Self::UpdatePassword,
        Self::UpdatePasswordError,
        Self::UpdateEmail,
        Self::VerifyEmail,
        Self::SendVerifyEmail,
        Self::SendResetPassword,
        Self::ResetPassword,
        Self::ResetPasswordError,
        Self::UpdateTotp,
        Self::RemoveTotp,
        Self::DeleteAccount,
        Self::DeleteAccountError,
        Self::CustomRequiredAction,
    ];

    /// Returns the host's name for this event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::LoginError => "LOGIN_ERROR",
            Self::ClientLogin => "CLIENT_LOGIN",
            Self::ClientLoginError => "CLIENT_LOGIN_ERROR",
            Self::Logout => "LOGOUT",
            Self::LogoutError => "LOGOUT_ERROR",
            Self::IdentityProviderLogin => "IDENTITY_PROVIDER_LOGIN",
            Self::IdentityProviderLoginError => "IDENTITY_PROVIDER_LOGIN_ERROR",
            Self::CodeToToken => "CODE_TO_TOKEN",
            Self::CodeToTokenError => "CODE_TO_TOKEN_ERROR",
            Self::RefreshToken => "REFRESH_TOKEN",
            Self::RefreshTokenError => "REFRESH_TOKEN_ERROR",
            Self::IntrospectToken => "INTROSPECT_TOKEN",
            Self::IntrospectTokenError => "INTROSPECT_TOKEN_ERROR",
            Self::TokenExchange => "TOKEN_EXCHANGE",
            Self::TokenExchangeError => "TOKEN_EXCHANGE_ERROR",
            Self::RevokeGrant => "REVOKE_GRANT",
            Self::Register => "REGISTER",
            Self::RegisterError => "REGISTER_ERROR",
            Self::UpdateProfile => "UPDATE_PROFILE",
            Self::UpdateProfileError => "UPDATE_PROFILE_ERROR",
            Self::UpdatePassword => "UPDATE_PASSWORD",
            Self::UpdatePasswordError => "UPDATE_PASSWORD_ERROR",
            Self::UpdateEmail => "UPDATE_EMAIL",
            Self::VerifyEmail => "VERIFY_EMAIL",
            Self::SendVerifyEmail => "SEND_VERIFY_EMAIL",
            Self::SendResetPassword => "SEND_RESET_PASSWORD",
            Self::ResetPassword => "RESET_PASSWORD",
            Self::ResetPasswordError => "RESET_PASSWORD_ERROR",
            Self::UpdateTotp => "UPDATE_TOTP",
            Self::RemoveTotp => "REMOVE_TOTP",
            Self::DeleteAccount => "DELETE_ACCOUNT",
            Self::DeleteAccountError => "DELETE_ACCOUNT_ERROR",
            Self::CustomRequiredAction => "CUSTOM_REQUIRED_ACTION",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownEventType(s.to_string()))
    }
}

/// Kind of an administrative operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Resource created.
    Create,
    /// Resource updated.
    Update,
    /// Resource deleted.
    Delete,
    /// Action performed on a resource (e.g. sending an email).
    Action,
}

impl OperationType {
    /// Every operation type, in declaration order.
    pub const ALL: &'static [Self] = &[Self::Create, Self::Update, Self::Delete, Self::Action];

    /// Returns the host's name for this operation type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Action => "ACTION",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownOperationType(s.to_string()))
    }
}

/// An action performed by or against an end user.
///
/// ## NIST 800-53 Rev5: AU-3 (Content of Audit Records)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    /// Time of the event.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,

    /// Kind of event.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Realm where the event occurred.
    pub realm_id: Option<String>,

    /// Client the user interacted with.
    pub client_id: Option<String>,

    /// Subject of the event. Absent for some kinds (e.g. failed logins
    /// for unknown usernames).
    pub user_id: Option<String>,

    /// User session.
    pub session_id: Option<String>,

    /// Source IP address.
    pub ip_address: Option<String>,

    /// Error code (for `*_ERROR` kinds).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl UserEvent {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> UserEventBuilder {
        UserEventBuilder::new(event_type)
    }
}

impl fmt::Display for UserEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} event [realm={}, client={}, user={}, session={}, ip={}",
            self.event_type,
            or_dash(self.realm_id.as_deref()),
            or_dash(self.client_id.as_deref()),
            or_dash(self.user_id.as_deref()),
            or_dash(self.session_id.as_deref()),
            or_dash(self.ip_address.as_deref()),
        )?;
        if let Some(error) = &self.error {
            write!(f, ", error={error}")?;
        }
        f.write_str("]")
    }
}

/// Builder for creating user events.
pub struct UserEventBuilder {
    time: Option<DateTime<Utc>>,
    event_type: EventType,
    realm_id: Option<String>,
    client_id: Option<String>,
    user_id: Option<String>,
    session_id: Option<String>,
    ip_address: Option<String>,
    error: Option<String>,
    details: BTreeMap<String, String>,
}

impl UserEventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            time: None,
            event_type,
            realm_id: None,
            client_id: None,
            user_id: None,
            session_id: None,
            ip_address: None,
            error: None,
            details: BTreeMap::new(),
        }
    }

    /// Sets the event time. Defaults to the time of [`build`](Self::build).
    #[must_use]
    pub const fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Sets the realm ID.
    #[must_use]
    pub fn realm(mut self, realm_id: impl Into<String>) -> Self {
        self.realm_id = Some(realm_id.into());
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the user ID.
    #[must_use]
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the session ID.
    #[must_use]
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the IP address.
    #[must_use]
    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Sets the error code.
    #[must_use]
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> UserEvent {
        UserEvent {
            time: self.time.unwrap_or_else(Utc::now),
            event_type: self.event_type,
            realm_id: self.realm_id,
            client_id: self.client_id,
            user_id: self.user_id,
            session_id: self.session_id,
            ip_address: self.ip_address,
            error: self.error,
            details: self.details,
        }
    }
}

/// Who performed an administrative action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthDetails {
    /// Realm of the authenticated admin.
    pub realm_id: Option<String>,

    /// Client the admin used (e.g. `admin-cli`).
    pub client_id: Option<String>,

    /// Admin user ID.
    pub user_id: Option<String>,

    /// Source IP address.
    pub ip_address: Option<String>,
}

impl AuthDetails {
    /// Creates auth details for an action performed through the given client.
    #[must_use]
    pub fn for_client(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Self::default()
        }
    }
}

/// An action performed through the admin API.
///
/// ## NIST 800-53 Rev5: AU-3 (Content of Audit Records)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEvent {
    /// Time of the event.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,

    /// Realm the affected resource belongs to.
    pub realm_id: Option<String>,

    /// Who performed the action.
    pub auth_details: AuthDetails,

    /// Kind of operation.
    pub operation_type: OperationType,

    /// Kind of resource (e.g. `USER`, `CLIENT`).
    pub resource_type: Option<String>,

    /// Path of the affected resource, relative to the realm (e.g. `users/{id}`).
    pub resource_path: String,

    /// Serialized snapshot of the resource. Only present when the host was
    /// configured to include representations.
    pub representation: Option<String>,

    /// Error code, if the operation failed.
    pub error: Option<String>,
}

impl AdminEvent {
    /// Creates a new admin event builder.
    #[must_use]
    pub fn builder(operation_type: OperationType, resource_path: impl Into<String>) -> AdminEventBuilder {
        AdminEventBuilder::new(operation_type, resource_path)
    }

    /// Returns a copy of this event without its representation.
    #[must_use]
    pub fn without_representation(&self) -> Self {
        Self {
            representation: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for AdminEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [realm={}, client={}, user={}, ip={}",
            self.operation_type,
            self.resource_path,
            or_dash(self.realm_id.as_deref()),
            or_dash(self.auth_details.client_id.as_deref()),
            or_dash(self.auth_details.user_id.as_deref()),
            or_dash(self.auth_details.ip_address.as_deref()),
        )?;
        if let Some(error) = &self.error {
            write!(f, ", error={error}")?;
        }
        f.write_str("]")
    }
}

/// Builder for creating admin events.
pub struct AdminEventBuilder {
    time: Option<DateTime<Utc>>,
    realm_id: Option<String>,
    auth_details: AuthDetails,
    operation_type: OperationType,
    resource_type: Option<String>,
    resource_path: String,
    representation: Option<String>,
    error: Option<String>,
}

impl AdminEventBuilder {
    /// Creates a new admin event builder.
    #[must_use]
    pub fn new(operation_type: OperationType, resource_path: impl Into<String>) -> Self {
        Self {
            time: None,
            realm_id: None,
            auth_details: AuthDetails::default(),
            operation_type,
            resource_type: None,
            resource_path: resource_path.into(),
            representation: None,
            error: None,
        }
    }

    /// Sets the event time. Defaults to the time of [`build`](Self::build).
    #[must_use]
    pub const fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Sets the realm ID.
    #[must_use]
    pub fn realm(mut self, realm_id: impl Into<String>) -> Self {
        self.realm_id = Some(realm_id.into());
        self
    }

    /// Sets who performed the action.
    #[must_use]
    pub fn auth(mut self, auth_details: AuthDetails) -> Self {
        self.auth_details = auth_details;
        self
    }

    /// Sets the resource type.
    #[must_use]
    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Sets the resource representation.
    #[must_use]
    pub fn representation(mut self, representation: impl Into<String>) -> Self {
        self.representation = Some(representation.into());
        self
    }

    /// Sets the error code.
    #[must_use]
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> AdminEvent {
        AdminEvent {
            time: self.time.unwrap_or_else(Utc::now),
            realm_id: self.realm_id,
            auth_details: self.auth_details,
            operation_type: self.operation_type,
            resource_type: self.resource_type,
            resource_path: self.resource_path,
            representation: self.representation,
            error: self.error,
        }
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
