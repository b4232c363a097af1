use anyhow::Result;

pub const ERR_UNEXPECTED_SERVER_CHALLENGE: &str = "sasl: unexpected server challenge";

/// The client side of a SASL mechanism, as driven by a `saslStart` command.
pub trait Client {
    /// Returns the mechanism name and the initial response that goes into the
    /// `payload` field of `saslStart`.
    fn start(&mut self) -> Result<(String, Vec<u8>)>;

    /// Answers a server challenge with the next `saslContinue` payload.
    /// Single-step mechanisms fail here.
    fn next(&mut self, challenge: &[u8]) -> Result<Vec<u8>>;
}
