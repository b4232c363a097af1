/// A user name and secret presented to the external identity provider.
///
/// Contents are not validated: empty or unusual values are passed through and
/// the server decides whether to accept them.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    name: String,
    secret: String,
}

impl Credential {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

// The secret never ends up in logs or panic messages.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[test]
fn test_debug_redacts_secret() -> anyhow::Result<()> {
    use anyhow::bail;

    let printed = format!("{:?}", Credential::new("alice", "hunter2"));
    if !printed.contains("alice") || printed.contains("hunter2") {
        bail!("Invalid debug output: {}", printed);
    }

    Ok(())
}

#[test]
fn test_empty_values_are_kept() -> anyhow::Result<()> {
    use anyhow::bail;

    let credential = Credential::new("", "");
    if !credential.name().is_empty() || !credential.secret().is_empty() {
        bail!("Credential changed its values: {:?}", credential);
    }

    Ok(())
}
