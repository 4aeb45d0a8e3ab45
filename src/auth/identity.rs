use std::fmt;

/// Account password. Never printed; only its digest leaves the process.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Account name and secret used by every session operation.
#[derive(Debug, Clone)]
pub struct Identity {
    account: String,
    secret: Secret,
}

impl Identity {
    pub fn new(account: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            secret: Secret::new(secret),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secret() {
        let identity = Identity::new("reader", "hunter2");
        let printed = format!("{identity:?}");
        assert!(printed.contains("reader"));
        assert!(!printed.contains("hunter2"));
    }
}
