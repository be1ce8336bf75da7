use catalog_auth::Principal;
use catalog_users::User;

/// The authenticated caller, inserted by the auth middleware.
///
/// Present on every protected route; public routes never see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(User);

impl CurrentUser {
    pub fn new(user: User) -> Self {
        Self(user)
    }

    pub fn user(&self) -> &User {
        &self.0
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.0.id, self.0.username.clone())
    }
}
