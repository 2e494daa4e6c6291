use crate::mixer::models::User;

/// Users whose deposits reached the house and who are still owed coins.
///
/// Ordered by insertion and unique by deposit address: inserting a user that
/// is already queued drops the old entry and appends the new one. Owned by
/// the return polling task.
#[derive(Debug, Default)]
pub struct PayoutQueue {
    users: Vec<User>,
}

impl PayoutQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: User) {
        self.users
            .retain(|queued| queued.deposit_address != user.deposit_address);
        self.users.push(user);
    }

    /// Take every queued user out, leaving the queue empty
    pub fn drain(&mut self) -> Vec<User> {
        std::mem::take(&mut self.users)
    }

    /// Replace the queue with the users still owed after a round
    pub fn replace(&mut self, pending: Vec<User>) {
        self.users = pending;
    }

    #[cfg(test)]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
