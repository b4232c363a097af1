use crate::sasl;

use anyhow::{anyhow, Result};

/// The PLAIN mechanism name.
pub const PLAIN: &str = "PLAIN";

const SEPARATOR: u8 = b'\x00';

/// Encodes a PLAIN message, `authzid\0authcid\0passwd`, as described in
/// RFC 4616. There is no trailing separator.
pub fn encode_payload(identity: &str, username: &str, password: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(identity.len() + username.len() + password.len() + 2);
    payload.extend_from_slice(identity.as_bytes());
    payload.push(SEPARATOR);
    payload.extend_from_slice(username.as_bytes());
    payload.push(SEPARATOR);
    payload.extend_from_slice(password.as_bytes());
    payload
}

/// A client implementation of the PLAIN authentication mechanism, as described
/// in RFC 4616. Authorization identity may be left blank to indicate that it is
/// the same as the username.
pub struct PlainClient<'a> {
    identity: &'a str,
    username: &'a str,
    password: &'a str,
}

impl<'a> PlainClient<'a> {
    pub fn new(username: &'a str, password: &'a str) -> Self {
        Self {
            identity: "",
            username,
            password,
        }
    }

    /// Requests to act as `identity` instead of the authenticated user.
    pub fn with_identity(mut self, identity: &'a str) -> Self {
        self.identity = identity;
        self
    }
}

impl sasl::Client for PlainClient<'_> {
    fn start(&mut self) -> Result<(String, Vec<u8>)> {
        Ok((
            PLAIN.to_string(),
            encode_payload(self.identity, self.username, self.password),
        ))
    }

    fn next(&mut self, _challenge: &[u8]) -> Result<Vec<u8>> {
        Err(anyhow!(sasl::ERR_UNEXPECTED_SERVER_CHALLENGE))
    }
}

#[test]
fn test_new_plain_client() -> Result<()> {
    use crate::sasl::Client;
    use anyhow::bail;

    let mut c = PlainClient::new("alice", "hunter2");

    let (mech, ir) = c.start().map_err(|e| anyhow!("Error while starting client: {}", e))?;
    if mech != PLAIN {
        bail!("Invalid mechanism name: {}", mech);
    }

    let expected = vec!(0, 97, 108, 105, 99, 101, 0, 104, 117, 110, 116, 101, 114, 50);
    if ir != expected {
        bail!("Invalid initial response: {:?}", ir);
    }

    Ok(())
}

#[test]
fn test_plain_client_with_identity() -> Result<()> {
    use crate::sasl::Client;
    use anyhow::bail;

    let mut c = PlainClient::new("username", "password").with_identity("identity");

    let (_, ir) = c.start()?;
    if ir != b"identity\x00username\x00password" {
        bail!("Invalid initial response: {:?}", ir);
    }

    Ok(())
}

#[test]
fn test_plain_client_rejects_challenge() -> Result<()> {
    use crate::sasl::Client;
    use anyhow::bail;

    let mut c = PlainClient::new("alice", "hunter2");

    match c.next(b"more?") {
        Err(e) if e.to_string() == sasl::ERR_UNEXPECTED_SERVER_CHALLENGE => Ok(()),
        other => bail!("Expected an unexpected challenge error, got {:?}", other),
    }
}

#[test]
fn test_encode_payload_edge_cases() -> Result<()> {
    use anyhow::bail;

    if encode_payload("", "", "") != vec![0, 0] {
        bail!("Empty credentials must encode to two separators");
    }

    let payload = encode_payload("", "jérôme", "pässwörd");
    let expected = [&[0u8][..], "jérôme".as_bytes(), &[0], "pässwörd".as_bytes()].concat();
    if payload != expected {
        bail!("Invalid UTF-8 payload: {:?}", payload);
    }
    if payload.last() == Some(&0) {
        bail!("Payload must not end with a separator");
    }

    Ok(())
}
