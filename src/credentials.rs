use md5::{Digest, Md5};
use tracing::{info, warn};

use crate::session::Session;

/// Demo login table: identifier -> hex MD5 of the secret.
/// Unsalted and fast; this store is a demonstration, not a security boundary.
const USERS: &[(&str, &str)] = &[
    // password
    ("bank", "5f4dcc3b5aa765d61d8327deb882cf99"),
    // 123456
    ("regulator", "e10adc3949ba59abbe56e057f20f883e"),
    // admin
    ("admin", "21232f297a57a5a743894a0e4a801fc3"),
];

/// Checks a submitted secret against a stored digest.
pub trait CredentialVerifier {
    fn verify(&self, secret: &str, stored: &str) -> bool;
}

/// Hex-encoded unsalted MD5, compared byte for byte.
#[derive(Debug, Default, Clone, Copy)]
pub struct Md5Verifier;

impl Md5Verifier {
    pub fn digest(secret: &str) -> String {
        hex::encode(Md5::digest(secret.as_bytes()))
    }
}

impl CredentialVerifier for Md5Verifier {
    fn verify(&self, secret: &str, stored: &str) -> bool {
        Self::digest(secret).as_bytes() == stored.as_bytes()
    }
}

/// Fixed identifier -> digest mapping. Not extensible at runtime.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    entries: Vec<(&'static str, &'static str)>,
}

impl CredentialStore {
    /// The built-in demo users.
    pub fn builtin() -> Self {
        CredentialStore {
            entries: USERS.to_vec(),
        }
    }

    pub fn lookup(&self, identifier: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(id, _)| *id == identifier)
            .map(|(_, digest)| *digest)
    }

    /// Identifiers offered on the login surface, in table order.
    pub fn identifiers(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::builtin()
    }
}

pub struct Authenticator<V: CredentialVerifier = Md5Verifier> {
    store: CredentialStore,
    verifier: V,
}

impl Authenticator<Md5Verifier> {
    pub fn new(store: CredentialStore) -> Self {
        Self::with_verifier(store, Md5Verifier)
    }
}

impl Default for Authenticator<Md5Verifier> {
    fn default() -> Self {
        Self::new(CredentialStore::builtin())
    }
}

impl<V: CredentialVerifier> Authenticator<V> {
    pub fn with_verifier(store: CredentialStore, verifier: V) -> Self {
        Authenticator { store, verifier }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// True iff `identifier` is known and `secret` hashes to its stored digest.
    /// Unknown identifiers fail closed.
    pub fn authenticate(&self, identifier: &str, secret: &str) -> bool {
        match self.store.lookup(identifier) {
            Some(stored) => self.verifier.verify(secret, stored),
            None => false,
        }
    }

    /// Authenticate and open a fresh session on success.
    pub fn login(&self, identifier: &str, secret: &str, capacity: usize) -> Option<Session> {
        if self.authenticate(identifier, secret) {
            info!(user = identifier, "login succeeded");
            Some(Session::new(identifier, capacity))
        } else {
            warn!(user = identifier, "login failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_digests_match_demo_secrets() {
        let store = CredentialStore::builtin();
        for (user, secret) in [("bank", "password"), ("regulator", "123456"), ("admin", "admin")] {
            assert_eq!(store.lookup(user), Some(Md5Verifier::digest(secret).as_str()));
        }
    }

    #[test]
    fn test_builtin_digests_are_md5_hex() {
        assert_eq!(
            CredentialStore::builtin().lookup("bank"),
            Some("5f4dcc3b5aa765d61d8327deb882cf99")
        );
        assert_eq!(Md5Verifier::digest("admin"), "21232f297a57a5a743894a0e4a801fc3");
    }

    #[test]
    fn test_identifiers_in_table_order() {
        assert_eq!(
            CredentialStore::builtin().identifiers(),
            vec!["bank", "regulator", "admin"]
        );
    }

    struct AcceptAll;

    impl CredentialVerifier for AcceptAll {
        fn verify(&self, _secret: &str, _stored: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_custom_verifier_still_fails_closed_on_unknown_user() {
        let auth = Authenticator::with_verifier(CredentialStore::builtin(), AcceptAll);
        assert!(auth.authenticate("bank", "anything"));
        assert!(!auth.authenticate("mallory", "anything"));
    }
}
