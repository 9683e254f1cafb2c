use crate::errors::AppError;
use crate::models::{NewRound, Round, RoundPatch};
use crate::services::Resource;
use crate::store::Store;

#[derive(Clone)]
pub struct RoundService {
    resource: Resource<Round>,
}

impl RoundService {
    pub fn new(store: Store) -> Self {
        Self {
            resource: Resource::new(store),
        }
    }

    pub async fn list(&self) -> Result<Vec<Round>, AppError> {
        self.resource.list().await
    }

    pub async fn get(&self, id: &str) -> Result<Round, AppError> {
        self.resource.get(id).await
    }

    pub async fn create(&self, input: NewRound) -> Result<Round, AppError> {
        input.validate()?;
        self.resource
            .insert(|id, now| input.into_record(id, now))
            .await
    }

    pub async fn update(&self, id: &str, patch: RoundPatch) -> Result<Round, AppError> {
        self.resource.modify(id, |round| round.apply(patch)).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.resource.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patch;

    #[tokio::test]
    async fn test_round_lifecycle() {
        let svc = RoundService::new(Store::in_memory());
        let r = svc
            .create(NewRound {
                day_of_week: Some(3),
                ..NewRound::new("Worthing")
            })
            .await
            .unwrap();
        assert_eq!(svc.list().await.unwrap(), vec![r.clone()]);

        let updated = svc
            .update(
                &r.id,
                RoundPatch {
                    customers: Patch::Value(vec!["c-1".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.customers, Some(vec!["c-1".to_string()]));
        assert_eq!(updated.day_of_week, Some(3));

        svc.delete(&r.id).await.unwrap();
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_day_rejected_on_update() {
        let svc = RoundService::new(Store::in_memory());
        let r = svc.create(NewRound::new("Hove")).await.unwrap();
        let err = svc
            .update(
                &r.id,
                RoundPatch {
                    day_of_week: Patch::Value(9),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(svc.get(&r.id).await.unwrap().day_of_week, None);
    }
}
