use thiserror::Error;

/// Failure of a PLAIN authentication conversation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The server did not answer the request with `ok: 1`.
    #[error("sasl: authentication failed for user {user}")]
    Unauthorized { user: String },

    /// The reply does not follow the expected document shape.
    #[error("sasl: malformed server reply: {0}")]
    MalformedReply(String),

    /// The mechanism client could not produce its initial response.
    #[error("sasl: mechanism failed to start: {0}")]
    Mechanism(String),
}

impl AuthError {
    pub fn unauthorized(user: impl Into<String>) -> Self {
        AuthError::Unauthorized { user: user.into() }
    }

    /// Name of the rejected user, if this is an authorization failure.
    pub fn user(&self) -> Option<&str> {
        match self {
            AuthError::Unauthorized { user } => Some(user),
            AuthError::MalformedReply(_) | AuthError::Mechanism(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[test]
fn test_unauthorized_message() -> anyhow::Result<()> {
    use anyhow::bail;

    let err = AuthError::unauthorized("bob");
    if err.to_string() != "sasl: authentication failed for user bob" {
        bail!("Invalid message: {}", err);
    }
    if err.user() != Some("bob") {
        bail!("Invalid user: {:?}", err.user());
    }
    if AuthError::Mechanism("boom".to_string()).user().is_some() {
        bail!("Only authorization failures name a user");
    }

    Ok(())
}
