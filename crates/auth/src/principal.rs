use catalog_core::UserId;

/// Identity of an authenticated caller.
///
/// Built by the HTTP layer once a bearer token has been validated and its
/// subject resolved to a stored user; passed explicitly into every protected
/// service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
}

impl Principal {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

impl core::fmt::Display for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.username, self.user_id)
    }
}
