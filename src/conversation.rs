//! One round of SASL PLAIN authentication against an external provider.
//!
//! ```text
//! Created --start--> RequestIssued --finalize--> Authenticated | Failed
//! ```
//!
//! PLAIN completes in a single round trip: [`PlainConversation::start`] builds
//! the only request and [`PlainConversation::finalize`] consumes the only
//! reply. The conversation does no I/O; sending the request and reading the
//! reply is up to the connection.

use tracing::{debug, error, warn};

use crate::credential::Credential;
use crate::error::{AuthError, Result};
use crate::options::ConversationOptions;
use crate::plain::{PlainClient, PLAIN};
use crate::reply::{is_ok, ServerReply};
use crate::sasl::Client;
use crate::wire::{AuthRequest, SaslStart, WireFeatures};

/// A PLAIN conversation that has not seen a reply yet.
#[derive(Debug, Clone)]
pub struct PlainConversation<'c> {
    credential: &'c Credential,
    options: ConversationOptions,
}

impl<'c> PlainConversation<'c> {
    pub fn new(credential: &'c Credential) -> Self {
        Self::with_options(credential, ConversationOptions::default())
    }

    pub fn with_options(credential: &'c Credential, options: ConversationOptions) -> Self {
        Self {
            credential,
            options,
        }
    }

    pub fn credential(&self) -> &'c Credential {
        self.credential
    }

    /// Builds the authentication request for a connection with the given
    /// features. Without features the legacy query format is used.
    ///
    /// The payload is `\0<name>\0<secret>`: PLAIN with an empty authorization
    /// identity. This does not change the conversation; calling it again gives
    /// an identical request.
    pub fn start(&self, features: Option<WireFeatures>) -> Result<AuthRequest> {
        let mut client = PlainClient::new(self.credential.name(), self.credential.secret());
        let (mechanism, payload) = client
            .start()
            .map_err(|e| AuthError::Mechanism(e.to_string()))?;

        let command = SaslStart::new(&mechanism, payload, self.options.auto_authorize);
        let request = AuthRequest::build(command, &self.options.source, features);

        debug!(
            mechanism = %mechanism,
            user = self.credential.name(),
            source = %self.options.source,
            op_msg = request.is_modern(),
            "Built saslStart request"
        );
        Ok(request)
    }

    /// Checks the server reply. On success the reply is kept by the returned
    /// [`Authenticated`] value; otherwise the conversation ends with
    /// [`AuthError::Unauthorized`] naming the user.
    pub fn finalize<R: ServerReply>(self, reply: R) -> Result<Authenticated<'c, R>> {
        let user = self.credential.name();

        match is_ok(&reply) {
            Ok(true) => {
                debug!(mechanism = PLAIN, user, "Authentication succeeded");
                Ok(Authenticated {
                    credential: self.credential,
                    reply,
                })
            }
            Ok(false) => {
                warn!(mechanism = PLAIN, user, "Authentication rejected by server");
                Err(AuthError::unauthorized(user))
            }
            Err(err) => {
                error!(mechanism = PLAIN, user, error = %err, "Could not read authentication reply");
                Err(err)
            }
        }
    }
}

/// A conversation that ended with the server accepting the credential.
#[derive(Debug, Clone)]
pub struct Authenticated<'c, R> {
    credential: &'c Credential,
    reply: R,
}

impl<'c, R> Authenticated<'c, R> {
    pub fn credential(&self) -> &'c Credential {
        self.credential
    }

    pub fn reply(&self) -> &R {
        &self.reply
    }

    pub fn into_reply(self) -> R {
        self.reply
    }
}

#[test]
fn test_start_modern() -> anyhow::Result<()> {
    use anyhow::bail;
    use serde_json::json;

    let credential = Credential::new("alice", "hunter2");
    let conversation = PlainConversation::new(&credential);

    let request = conversation.start(Some(WireFeatures::new(true)))?;
    let AuthRequest::Modern(modern) = &request else {
        bail!("Expected a message-style request, got {:?}", request);
    };

    let body = serde_json::to_value(&modern.body)?;
    let expected = json!({
        "saslStart": 1,
        "autoAuthorize": 1,
        "payload": [0x00, 0x61, 0x6c, 0x69, 0x63, 0x65, 0x00, 0x68, 0x75, 0x6e, 0x74, 0x65, 0x72, 0x32],
        "mechanism": "PLAIN",
        "$db": "$external",
    });
    if body != expected {
        bail!("Invalid message body: {}", body);
    }
    if !modern.flags.is_empty() {
        bail!("Authentication sets no message flags: {:?}", modern.flags);
    }

    Ok(())
}

#[test]
fn test_start_legacy() -> anyhow::Result<()> {
    use anyhow::bail;

    let credential = Credential::new("alice", "hunter2");
    let conversation = PlainConversation::new(&credential);

    for features in [Some(WireFeatures::new(false)), None] {
        let request = conversation.start(features)?;
        let AuthRequest::Legacy(legacy) = &request else {
            bail!("Expected a legacy request, got {:?}", request);
        };

        if legacy.database != "$external" || legacy.namespace() != "$external.$cmd" {
            bail!("Invalid target: {}", legacy.namespace());
        }
        if legacy.limit != -1 {
            bail!("Invalid limit: {}", legacy.limit);
        }

        let selector = &legacy.selector;
        if selector.sasl_start != 1 || selector.auto_authorize != 1 || selector.mechanism != "PLAIN" {
            bail!("Invalid selector: {:?}", selector);
        }
        if selector.payload != b"\x00alice\x00hunter2" {
            bail!("Invalid payload: {:?}", selector.payload);
        }
    }

    Ok(())
}

#[test]
fn test_start_payload_has_no_trailing_separator() -> anyhow::Result<()> {
    use anyhow::bail;

    let credential = Credential::new("", "");
    let request = PlainConversation::new(&credential).start(None)?;
    if request.command().payload != vec![0, 0] {
        bail!("Invalid payload: {:?}", request.command().payload);
    }

    Ok(())
}

#[test]
fn test_start_is_repeatable() -> anyhow::Result<()> {
    use anyhow::bail;

    let credential = Credential::new("alice", "hunter2");
    let conversation = PlainConversation::new(&credential);

    for features in [None, Some(WireFeatures::new(true))] {
        if conversation.start(features)? != conversation.start(features)? {
            bail!("Requests differ for {:?}", features);
        }
    }

    Ok(())
}

#[test]
fn test_start_with_options() -> anyhow::Result<()> {
    use anyhow::bail;

    let credential = Credential::new("alice", "hunter2");
    let options = ConversationOptions::from_json(r#"{"source": "ldap", "autoAuthorize": false}"#)?;
    let conversation = PlainConversation::with_options(&credential, options);

    let request = conversation.start(Some(WireFeatures::new(true)))?;
    if request.database() != "ldap" || request.command().auto_authorize != 0 {
        bail!("Options were not applied: {:?}", request);
    }

    Ok(())
}

#[test]
fn test_finalize_success() -> anyhow::Result<()> {
    use anyhow::bail;
    use serde_json::json;

    let credential = Credential::new("alice", "hunter2");
    let reply = vec![json!({"ok": 1, "conversationId": 1, "done": true})];

    let authenticated = PlainConversation::new(&credential).finalize(reply.clone())?;
    if authenticated.reply() != &reply || authenticated.credential().name() != "alice" {
        bail!("Invalid authenticated conversation: {:?}", authenticated);
    }
    if authenticated.into_reply() != reply {
        bail!("Reply was changed");
    }

    Ok(())
}

#[test]
fn test_finalize_command_reply() -> anyhow::Result<()> {
    use crate::reply::CommandReply;
    use anyhow::bail;
    use serde_json::json;

    let credential = Credential::new("alice", "hunter2");
    let reply = CommandReply::from_document(json!({"ok": 1.0}))?;

    let authenticated = PlainConversation::new(&credential).finalize(reply.clone())?;
    if authenticated.reply() != &reply {
        bail!("Invalid reply: {:?}", authenticated.reply());
    }

    Ok(())
}

#[test]
fn test_finalize_rejected() -> anyhow::Result<()> {
    use anyhow::bail;
    use serde_json::json;

    let credential = Credential::new("alice", "hunter2");

    for document in [json!({"ok": 0}), json!({"errmsg": "auth failed"}), json!({"ok": "yes"})] {
        match PlainConversation::new(&credential).finalize(vec![document.clone()]) {
            Err(err) if err == AuthError::unauthorized("alice") => {
                if err.to_string().contains("hunter2") {
                    bail!("Error leaks the secret: {}", err);
                }
            }
            other => bail!("Expected {} to be unauthorized, got {:?}", document, other),
        }
    }

    Ok(())
}

#[test]
fn test_finalize_empty_reply() -> anyhow::Result<()> {
    use anyhow::bail;
    use serde_json::Value;

    let credential = Credential::new("alice", "hunter2");

    match PlainConversation::new(&credential).finalize(Vec::<Value>::new()) {
        Err(AuthError::MalformedReply(_)) => Ok(()),
        other => bail!("Expected a malformed reply error, got {:?}", other),
    }
}

#[test]
fn test_unauthorized_propagates_as_anyhow() -> anyhow::Result<()> {
    use anyhow::bail;
    use serde_json::json;

    let credential = Credential::new("bob", "");
    let attempt = || -> anyhow::Result<()> {
        PlainConversation::new(&credential).finalize(vec![json!({"ok": 0})])?;
        Ok(())
    };

    match attempt() {
        Err(e) if e.to_string() == "sasl: authentication failed for user bob" => Ok(()),
        other => bail!("Unexpected outcome: {:?}", other),
    }
}
