//! Credential verification for organizations and gate staff.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::account::Role;
use crate::store::{catalog, Store, StoreError};

/// Resolves a credential pair to an account id. The comparison method is the
/// implementation's business; callers only see a match or no match.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(
        &self,
        role: Role,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, StoreError>;
}

/// Looks accounts up through the statement catalog; the store does the
/// comparison.
pub struct StoreCredentialVerifier {
    store: Arc<dyn Store>,
}

impl StoreCredentialVerifier {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialVerifier for StoreCredentialVerifier {
    async fn verify(
        &self,
        role: Role,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, StoreError> {
        let statement = match role {
            Role::Organization => catalog::VERIFY_ORGANIZATION,
            Role::Staff => catalog::VERIFY_STAFF,
        };

        let rows = self
            .store
            .exec_prepared(statement, &[Some(username), Some(password)])
            .await?;

        rows.first()
            .map(|row| row.text(0).map(str::to_string))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_roles_are_checked_separately() {
        let mut store = MemoryStore::new();
        catalog::register_all(&mut store).await.unwrap();
        let org_id = store.add_organization("acme", "hunter2").await;
        let staff_id = store.add_staff("gate1", "letmein").await;
        let verifier = StoreCredentialVerifier::new(Arc::new(store));

        assert_eq!(
            verifier.verify(Role::Organization, "acme", "hunter2").await.unwrap(),
            Some(org_id)
        );
        assert_eq!(
            verifier.verify(Role::Staff, "gate1", "letmein").await.unwrap(),
            Some(staff_id)
        );
        assert_eq!(
            verifier.verify(Role::Staff, "acme", "hunter2").await.unwrap(),
            None
        );
        assert_eq!(
            verifier.verify(Role::Organization, "acme", "wrong").await.unwrap(),
            None
        );
    }
}
