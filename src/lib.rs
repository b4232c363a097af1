//! Client-side SASL PLAIN authentication of a database connection against an
//! external identity provider, through the reserved `$external` database.
//!
//! ```
//! use lib_rust_sasl_external::{Credential, PlainConversation, WireFeatures};
//! use serde_json::json;
//!
//! let credential = Credential::new("alice", "hunter2");
//! let conversation = PlainConversation::new(&credential);
//!
//! let request = conversation.start(Some(WireFeatures::new(true))).unwrap();
//! assert_eq!(request.database(), "$external");
//!
//! // ... send `request`, receive the reply ...
//! let authenticated = conversation.finalize(vec![json!({"ok": 1})]).unwrap();
//! assert_eq!(authenticated.reply()[0]["ok"], 1);
//! ```

pub mod conversation;
pub mod credential;
pub mod error;
pub mod options;
pub mod plain;
pub mod reply;
pub mod sasl;
pub mod wire;

pub use conversation::{Authenticated, PlainConversation};
pub use credential::Credential;
pub use error::AuthError;
pub use options::ConversationOptions;
pub use reply::{CommandReply, ReplyDocument, ServerReply};
pub use wire::{AuthRequest, WireFeatures};
