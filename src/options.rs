use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::wire::EXTERNAL_DATABASE;

/// Tunables for a PLAIN conversation. The defaults target the `$external`
/// database with automatic authorization, which is what LDAP-style proxy
/// authentication expects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationOptions {
    /// Database the `saslStart` command is sent to.
    pub source: String,
    /// Sent as `autoAuthorize: 1`; `false` sends `autoAuthorize: 0`.
    pub auto_authorize: bool,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            source: EXTERNAL_DATABASE.to_string(),
            auto_authorize: true,
        }
    }
}

impl ConversationOptions {
    /// Reads options from a JSON object. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[test]
fn test_defaults() -> Result<()> {
    use anyhow::bail;

    let options = ConversationOptions::default();
    if options.source != "$external" || !options.auto_authorize {
        bail!("Invalid defaults: {:?}", options);
    }
    if ConversationOptions::from_json("{}")? != options {
        bail!("An empty object must give the defaults");
    }

    Ok(())
}

#[test]
fn test_from_json_partial() -> Result<()> {
    use anyhow::bail;

    let options = ConversationOptions::from_json(r#"{"autoAuthorize": false}"#)?;
    if options.source != "$external" || options.auto_authorize {
        bail!("Invalid options: {:?}", options);
    }

    Ok(())
}

#[test]
fn test_from_json_rejects_garbage() -> Result<()> {
    use anyhow::bail;

    if ConversationOptions::from_json("source=admin").is_ok() {
        bail!("Non-JSON input must be refused");
    }

    Ok(())
}
