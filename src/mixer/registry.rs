use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;

use crate::error::RegistrationError;
use crate::mixer::models::User;

/// Every user the mixer knows about, in registration order.
///
/// Append-only. Owned by the deposit polling task, which is the only place
/// it is read or written.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: Vec<User>,
    return_addresses: HashSet<String>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// First candidate already claimed by a registered user, if any.
    /// Has no side effects.
    pub fn register_if_addresses_free(&self, candidates: &[String]) -> Option<String> {
        candidates
            .iter()
            .find(|address| self.return_addresses.contains(address.as_str()))
            .cloned()
    }

    /// Check the candidates, mint a fresh deposit address and add the user.
    pub fn register(&mut self, return_addresses: Vec<String>) -> Result<User, RegistrationError> {
        if let Some(conflict) = self.register_if_addresses_free(&return_addresses) {
            return Err(RegistrationError::AddressInUse(conflict));
        }

        let mut seen = HashSet::with_capacity(return_addresses.len());
        for address in &return_addresses {
            if !seen.insert(address.as_str()) {
                return Err(RegistrationError::DuplicateAddress(address.clone()));
            }
        }

        let user = User::new(Uuid::new_v4().to_string(), return_addresses);
        self.insert(user.clone());
        Ok(user)
    }

    fn insert(&mut self, user: User) {
        info!("Adding user {} to registry", user.deposit_address);
        self.return_addresses
            .extend(user.return_addresses.iter().cloned());
        self.users.push(user);
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
