//! Outbound request shapes for the `saslStart` command.
//!
//! Servers that speak the message-based wire format take the target database
//! as a `$db` field of the command body. Older servers expect a query against
//! the `<db>.$cmd` namespace with a limit of -1 (single batch, no cursor).

use serde::{Deserialize, Serialize};

/// Reserved database that delegates authentication to an external provider.
pub const EXTERNAL_DATABASE: &str = "$external";

/// Collection that legacy command queries are run against.
pub const COMMAND_COLLECTION: &str = "$cmd";

/// Return everything in one batch and keep no cursor.
pub const LEGACY_QUERY_LIMIT: i32 = -1;

/// What the connection negotiated during its handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireFeatures {
    pub supports_op_msg: bool,
}

impl WireFeatures {
    pub fn new(supports_op_msg: bool) -> Self {
        Self {
            supports_op_msg,
        }
    }
}

/// The `saslStart` command document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaslStart {
    pub sasl_start: i32,
    pub auto_authorize: i32,
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
    pub mechanism: String,
}

impl SaslStart {
    pub fn new(mechanism: &str, payload: Vec<u8>, auto_authorize: bool) -> Self {
        Self {
            sasl_start: 1,
            auto_authorize: auto_authorize as i32,
            payload,
            mechanism: mechanism.to_string(),
        }
    }
}

/// Query-style command for servers without the message format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LegacyCommand {
    pub database: String,
    pub collection: String,
    pub selector: SaslStart,
    pub limit: i32,
}

impl LegacyCommand {
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

/// Message flag bits. The authentication command sets none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MessageFlags(u32);

impl MessageFlags {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MessageBody {
    #[serde(flatten)]
    pub command: SaslStart,
    #[serde(rename = "$db")]
    pub db: String,
}

/// Message-style command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModernCommand {
    pub body: MessageBody,
    pub flags: MessageFlags,
}

/// The single request of a PLAIN conversation, shaped for the connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum AuthRequest {
    Legacy(LegacyCommand),
    Modern(ModernCommand),
}

impl AuthRequest {
    /// Picks the request shape. Unknown features mean the legacy format.
    pub fn build(command: SaslStart, database: &str, features: Option<WireFeatures>) -> Self {
        match features {
            Some(WireFeatures { supports_op_msg: true }) => AuthRequest::Modern(ModernCommand {
                body: MessageBody {
                    command,
                    db: database.to_string(),
                },
                flags: MessageFlags::empty(),
            }),
            _ => AuthRequest::Legacy(LegacyCommand {
                database: database.to_string(),
                collection: COMMAND_COLLECTION.to_string(),
                selector: command,
                limit: LEGACY_QUERY_LIMIT,
            }),
        }
    }

    pub fn command(&self) -> &SaslStart {
        match self {
            AuthRequest::Legacy(legacy) => &legacy.selector,
            AuthRequest::Modern(modern) => &modern.body.command,
        }
    }

    pub fn database(&self) -> &str {
        match self {
            AuthRequest::Legacy(legacy) => &legacy.database,
            AuthRequest::Modern(modern) => &modern.body.db,
        }
    }

    pub fn is_modern(&self) -> bool {
        matches!(self, AuthRequest::Modern(_))
    }
}

#[test]
fn test_modern_body_serialization() -> anyhow::Result<()> {
    use anyhow::bail;
    use serde_json::json;

    let command = SaslStart::new("PLAIN", vec![0, b'u', 0, b'p'], true);
    let request = AuthRequest::build(command, EXTERNAL_DATABASE, Some(WireFeatures::new(true)));
    let AuthRequest::Modern(modern) = &request else {
        bail!("Expected a message-style request, got {:?}", request);
    };

    let body = serde_json::to_value(&modern.body)?;
    let expected = json!({
        "saslStart": 1,
        "autoAuthorize": 1,
        "payload": [0, 117, 0, 112],
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
fn test_payload_is_binary() -> anyhow::Result<()> {
    use anyhow::bail;
    use bson::spec::ElementType;

    let command = SaslStart::new("PLAIN", vec![0, b'u', 0, b'p'], true);

    let document = bson::to_document(&command)?;
    let payload_type = document.get("payload").map(bson::Bson::element_type);
    if payload_type != Some(ElementType::Binary) {
        bail!("Payload must be encoded as binary, got {:?}", payload_type);
    }

    let request = AuthRequest::build(command, EXTERNAL_DATABASE, Some(WireFeatures::new(true)));
    let AuthRequest::Modern(modern) = &request else {
        bail!("Expected a message-style request, got {:?}", request);
    };
    let body = bson::to_document(&modern.body)?;
    match body.get("payload") {
        Some(bson::Bson::Binary(binary)) if binary.bytes == vec![0, b'u', 0, b'p'] => {}
        other => bail!("Invalid payload in message body: {:?}", other),
    }
    if body.get_str("$db")? != "$external" {
        bail!("Invalid $db in message body: {}", body);
    }

    Ok(())
}

#[test]
fn test_legacy_namespace() -> anyhow::Result<()> {
    use anyhow::bail;

    let command = SaslStart::new("PLAIN", Vec::new(), true);
    for features in [Some(WireFeatures::new(false)), None] {
        let request = AuthRequest::build(command.clone(), EXTERNAL_DATABASE, features);
        let AuthRequest::Legacy(legacy) = &request else {
            bail!("Expected a legacy request, got {:?}", request);
        };

        if legacy.namespace() != "$external.$cmd" {
            bail!("Invalid namespace: {}", legacy.namespace());
        }
        if legacy.limit != -1 {
            bail!("Invalid limit: {}", legacy.limit);
        }
        if request.command() != &command {
            bail!("Invalid selector: {:?}", legacy.selector);
        }
    }

    Ok(())
}

#[test]
fn test_auto_authorize_off() -> anyhow::Result<()> {
    use anyhow::bail;

    let command = SaslStart::new("PLAIN", Vec::new(), false);
    if command.auto_authorize != 0 {
        bail!("Invalid autoAuthorize: {}", command.auto_authorize);
    }

    Ok(())
}

#[test]
fn test_request_tagged_by_format() -> anyhow::Result<()> {
    use anyhow::bail;

    let command = SaslStart::new("PLAIN", vec![0, b'u', 0, b'p'], true);
    let request = AuthRequest::build(command, EXTERNAL_DATABASE, None);

    let value = serde_json::to_value(&request)?;
    if value["format"] != "legacy" || value["collection"] != "$cmd" {
        bail!("Invalid legacy request: {}", value);
    }

    let decoded: AuthRequest = serde_json::from_value(value)?;
    if decoded != request {
        bail!("Decoded request differs: {:?}", decoded);
    }

    Ok(())
}
