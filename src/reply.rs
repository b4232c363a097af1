//! Server replies, as far as authentication cares about them.
//!
//! A reply is an ordered sequence of documents and only the `ok` field of the
//! first one is ever read, so any document model can be plugged in by
//! implementing [`ReplyDocument`] and [`ServerReply`].

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthError;

/// Field set to 1 by the server when a command succeeded.
pub const OK_FIELD: &str = "ok";

pub trait ReplyDocument {
    /// Numeric value stored under `key`, if there is one.
    fn number(&self, key: &str) -> Option<f64>;
}

impl ReplyDocument for Map<String, Value> {
    fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }
}

impl ReplyDocument for Value {
    fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }
}

pub trait ServerReply {
    type Document: ReplyDocument;

    fn documents(&self) -> &[Self::Document];
}

impl<D: ReplyDocument> ServerReply for Vec<D> {
    type Document = D;

    fn documents(&self) -> &[D] {
        self
    }
}

/// Reply documents decoded into JSON objects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CommandReply {
    pub documents: Vec<Map<String, Value>>,
}

impl CommandReply {
    pub fn new(documents: Vec<Map<String, Value>>) -> Self {
        Self {
            documents,
        }
    }

    /// Wraps a single reply document. Anything but a JSON object is refused.
    pub fn from_document(document: Value) -> Result<Self> {
        match document {
            Value::Object(map) => Ok(Self::new(vec![map])),
            other => Err(anyhow!("reply document is not an object: {}", other)),
        }
    }
}

impl ServerReply for CommandReply {
    type Document = Map<String, Value>;

    fn documents(&self) -> &[Self::Document] {
        &self.documents
    }
}

/// Reports whether the first document has `ok` equal to 1.
///
/// A missing or non-numeric `ok` counts as failure. A reply without any
/// document breaks the reply contract and is an error.
pub fn is_ok<R: ServerReply>(reply: &R) -> std::result::Result<bool, AuthError> {
    let first = reply
        .documents()
        .first()
        .ok_or_else(|| AuthError::MalformedReply("reply contains no documents".to_string()))?;

    Ok(first.number(OK_FIELD) == Some(1.0))
}

#[test]
fn test_ok_values() -> Result<()> {
    use anyhow::bail;
    use serde_json::json;

    for document in [json!({"ok": 1}), json!({"ok": 1.0})] {
        if !is_ok(&vec![document.clone()])? {
            bail!("Reply should be accepted: {}", document);
        }
    }

    let rejected = [
        json!({"ok": 0}),
        json!({"ok": 2}),
        json!({"ok": "1"}),
        json!({"ok": true}),
        json!({"errmsg": "denied"}),
    ];
    for document in rejected {
        if is_ok(&vec![document.clone()])? {
            bail!("Reply should be rejected: {}", document);
        }
    }

    Ok(())
}

#[test]
fn test_only_first_document_counts() -> Result<()> {
    use anyhow::bail;
    use serde_json::json;

    if is_ok(&vec![json!({"ok": 0}), json!({"ok": 1})])? {
        bail!("Only the first document decides the outcome");
    }

    Ok(())
}

#[test]
fn test_empty_reply_is_malformed() -> Result<()> {
    use anyhow::bail;

    match is_ok(&Vec::<Value>::new()) {
        Err(AuthError::MalformedReply(_)) => Ok(()),
        other => bail!("Expected a malformed reply error, got {:?}", other),
    }
}

#[test]
fn test_command_reply() -> Result<()> {
    use anyhow::bail;
    use serde_json::json;

    let reply: CommandReply = serde_json::from_str(r#"{"documents": [{"ok": 1, "done": true}]}"#)?;
    if reply.documents().len() != 1 || !is_ok(&reply)? {
        bail!("Invalid decoded reply: {:?}", reply);
    }

    if !is_ok(&CommandReply::from_document(json!({"ok": 1}))?)? {
        bail!("Single document reply should be accepted");
    }
    if CommandReply::from_document(json!([1, 2])).is_ok() {
        bail!("Only objects are reply documents");
    }

    Ok(())
}
