//! Issued sign-in tokens

use super::AuthToken;
use crate::session::UserId;
use std::collections::HashMap;
use uuid::Uuid;

/// Live tokens, by token string
///
/// Never persisted: restarting the store signs everybody out.
#[derive(Debug, Clone, Default)]
pub(crate) struct TokenTable {
    tokens: HashMap<String, UserId>,
}

impl TokenTable {
    /// Issue a fresh token for `uid`
    pub fn issue(&mut self, uid: UserId) -> AuthToken {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), uid);
        AuthToken::new(token)
    }

    /// Forget a token; returns whether it was live
    pub fn revoke(&mut self, token: &AuthToken) -> bool {
        self.tokens.remove(token.as_str()).is_some()
    }

    /// User a token belongs to
    pub fn resolve(&self, token: &AuthToken) -> Option<&UserId> {
        self.tokens.get(token.as_str())
    }

    /// Number of live tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_resolve_revoke() {
        let mut table = TokenTable::default();
        let token = table.issue(UserId::new("u1"));

        assert_eq!(table.resolve(&token), Some(&UserId::new("u1")));
        assert_eq!(table.len(), 1);

        assert!(table.revoke(&token));
        assert!(!table.revoke(&token));
        assert_eq!(table.resolve(&token), None);
    }

    #[test]
    fn test_tokens_are_distinct() {
        let mut table = TokenTable::default();
        let a = table.issue(UserId::new("u1"));
        let b = table.issue(UserId::new("u1"));
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }
}
