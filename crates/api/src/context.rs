use doorman_auth::Principal;

/// Principal context for a request (authenticated identity).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> Principal {
        self.principal
    }
}

/// The raw bearer token presented on the request.
///
/// Kept around so logout can revoke exactly the credential it was called with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenContext {
    raw: String,
}

impl TokenContext {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}
