use crate::errors::AppError;
use crate::models::{Customer, CustomerPatch, NewCustomer};
use crate::services::Resource;
use crate::store::Store;

/// Customer CRUD.
///
/// Deleting a customer leaves their jobs in place with a dangling
/// `customerId`; removing those is the caller's concern.
#[derive(Clone)]
pub struct CustomerService {
    resource: Resource<Customer>,
}

impl CustomerService {
    pub fn new(store: Store) -> Self {
        Self {
            resource: Resource::new(store),
        }
    }

    pub async fn list(&self) -> Result<Vec<Customer>, AppError> {
        self.resource.list().await
    }

    pub async fn get(&self, id: &str) -> Result<Customer, AppError> {
        self.resource.get(id).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.resource.list().await?.iter().any(|c| c.id == id))
    }

    pub async fn create(&self, input: NewCustomer) -> Result<Customer, AppError> {
        input.validate()?;
        self.resource
            .insert(|id, now| input.into_record(id, now))
            .await
    }

    pub async fn update(&self, id: &str, patch: CustomerPatch) -> Result<Customer, AppError> {
        self.resource.modify(id, |customer| customer.apply(patch)).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.resource.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patch;

    fn service() -> CustomerService {
        CustomerService::new(Store::in_memory())
    }

    #[tokio::test]
    async fn test_create_stamps_id_and_equal_timestamps() {
        let svc = service();
        let c = svc
            .create(NewCustomer::new("Ada", "1 High St, Worthing"))
            .await
            .unwrap();
        assert!(!c.id.is_empty());
        assert_eq!(c.created_at, c.updated_at);
        assert_eq!(svc.get(&c.id).await.unwrap(), c);
    }

    #[tokio::test]
    async fn test_create_invalid_persists_nothing() {
        let svc = service();
        assert!(svc.create(NewCustomer::new("", "1 High St")).await.is_err());
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let svc = service();
        let c = svc.create(NewCustomer::new("Ada", "1 High St")).await.unwrap();
        assert_eq!(svc.get(&c.id).await.unwrap(), svc.get(&c.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_merges_and_refreshes_updated_at() {
        let svc = service();
        let c = svc
            .create(NewCustomer {
                phone: Some("0123".into()),
                ..NewCustomer::new("Ada", "1 High St")
            })
            .await
            .unwrap();

        let patch = CustomerPatch {
            verified: Patch::Value(true),
            latitude: Patch::Value(50.81),
            longitude: Patch::Value(-0.37),
            ..Default::default()
        };
        let updated = svc.update(&c.id, patch).await.unwrap();
        assert!(updated.verified);
        assert_eq!(updated.phone.as_deref(), Some("0123"));
        assert_eq!(updated.created_at, c.created_at);
        assert!(updated.updated_at > c.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let err = service()
            .update("missing", CustomerPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let svc = service();
        let c = svc.create(NewCustomer::new("Ada", "1 High St")).await.unwrap();
        svc.delete(&c.id).await.unwrap();
        assert!(!svc.exists(&c.id).await.unwrap());
        assert!(matches!(
            svc.get(&c.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
