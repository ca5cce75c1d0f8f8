use crate::domain::UserId;

/// Immutable allow-list gating the administrative commands.
///
/// SECURITY NOTE: an empty allow-list authorizes EVERY user. This is the
/// backward-compatible default inherited from earlier deployments that had no
/// access control; set `AUTHORIZED_USERS` to restrict access. The list is
/// loaded once at startup and never mutated at runtime.
#[derive(Clone, Debug, Default)]
pub struct AuthorizationGate {
    allowed: Vec<UserId>,
}

impl AuthorizationGate {
    pub fn new(allowed: impl IntoIterator<Item = i64>) -> Self {
        let mut out: Vec<UserId> = Vec::new();
        for id in allowed {
            let id = UserId(id);
            if !out.contains(&id) {
                out.push(id);
            }
        }
        Self { allowed: out }
    }

    /// Whether the given caller may run a gated command. A caller without a
    /// user id (e.g. an anonymous channel admin) is only authorized when the
    /// gate is open.
    pub fn is_authorized(&self, user: Option<UserId>) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        match user {
            Some(u) => self.allowed.contains(&u),
            None => false,
        }
    }

    /// True when no allow-list is configured (everyone is authorized).
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn users(&self) -> &[UserId] {
        &self.allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_authorizes_everyone() {
        let gate = AuthorizationGate::new([]);
        assert!(gate.is_open());
        assert!(gate.is_authorized(Some(UserId(1))));
        assert!(gate.is_authorized(Some(UserId(-42))));
        assert!(gate.is_authorized(None));
    }

    #[test]
    fn configured_list_authorizes_only_listed_ids() {
        let gate = AuthorizationGate::new([10, 20]);
        assert!(!gate.is_open());
        assert!(gate.is_authorized(Some(UserId(10))));
        assert!(gate.is_authorized(Some(UserId(20))));
        assert!(!gate.is_authorized(Some(UserId(30))));
        assert!(!gate.is_authorized(None));
    }

    #[test]
    fn duplicate_ids_collapse() {
        let gate = AuthorizationGate::new([7, 7, 7]);
        assert_eq!(gate.users(), &[UserId(7)]);
    }
}
