//! Leave Type Registry: the policy catalog behind every other component.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{LeaveError, LeaveResult};
use crate::model::leave_type::DEFAULT_CATALOG;
use crate::model::{LeaveKind, LeaveType, NewLeaveType};
use crate::store::Store;

/// Outcome of a delete: removal succeeds even for referenced types, but the
/// caller is told historical rows still point at it.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct DeleteOutcome {
    pub deleted: bool,
    pub referenced: bool,
    #[schema(example = 12)]
    pub reference_count: u64,
}

pub struct TypeRegistry {
    store: Arc<Store>,
}

impl TypeRegistry {
    pub fn new(store: Arc<Store>) -> Self {
        TypeRegistry { store }
    }

    pub async fn list(&self) -> LeaveResult<Vec<LeaveType>> {
        self.store.list_leave_types().await
    }

    pub async fn get(&self, id: u64) -> LeaveResult<LeaveType> {
        self.store
            .get_leave_type(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("leave type"))
    }

    pub async fn get_by_kind(&self, kind: LeaveKind) -> LeaveResult<LeaveType> {
        self.store
            .list_leave_types()
            .await?
            .into_iter()
            .find(|t| t.kind == kind)
            .ok_or_else(|| LeaveError::not_found(format!("leave type {kind}")))
    }

    async fn check_abbr_unique(&self, abbr: &str, exclude_id: Option<u64>) -> LeaveResult<()> {
        let clash = self
            .store
            .list_leave_types()
            .await?
            .into_iter()
            .any(|t| t.abbr.eq_ignore_ascii_case(abbr) && Some(t.id) != exclude_id);
        if clash {
            return Err(LeaveError::validation(format!(
                "abbreviation '{abbr}' is already in use"
            )));
        }
        Ok(())
    }

    pub async fn create(&self, new: NewLeaveType) -> LeaveResult<LeaveType> {
        new.validate()?;
        self.check_abbr_unique(&new.abbr, None).await?;
        let mut lt = new.into_leave_type(0, Utc::now());
        lt.id = self.store.insert_leave_type(&lt).await?;
        Ok(lt)
    }

    /// Full replacement of the forward-looking policy. Historical
    /// applications keep the numbers computed under the old parameters.
    pub async fn update(&self, id: u64, new: NewLeaveType) -> LeaveResult<LeaveType> {
        new.validate()?;
        let existing = self.get(id).await?;
        self.check_abbr_unique(&new.abbr, Some(id)).await?;
        let updated = new.into_leave_type(id, existing.created_at);
        if !self.store.update_leave_type(&updated).await? {
            return Err(LeaveError::not_found("leave type"));
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: u64) -> LeaveResult<DeleteOutcome> {
        self.get(id).await?;
        let reference_count = self.store.count_type_references(id).await?;
        if reference_count > 0 {
            tracing::warn!(
                leave_type_id = id,
                reference_count,
                "deleting leave type still referenced by balances/applications"
            );
        }
        let deleted = self.store.delete_leave_type(id).await?;
        Ok(DeleteOutcome {
            deleted,
            referenced: reference_count > 0,
            reference_count,
        })
    }

    /// Seed the default catalog on an empty registry. Idempotent.
    pub async fn seed_defaults(&self) -> anyhow::Result<usize> {
        if !self.store.list_leave_types().await?.is_empty() {
            return Ok(0);
        }
        let mut seeded = 0;
        for template in DEFAULT_CATALOG.iter() {
            self.create(template.clone()).await?;
            seeded += 1;
        }
        log::info!("Leave type registry seeded with {seeded} default types");
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccrualMethod;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(Arc::new(Store::mem()))
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let reg = registry();
        assert_eq!(reg.seed_defaults().await.unwrap(), DEFAULT_CATALOG.len());
        assert_eq!(reg.seed_defaults().await.unwrap(), 0);
        assert_eq!(reg.list().await.unwrap().len(), DEFAULT_CATALOG.len());
    }

    #[tokio::test]
    async fn duplicate_abbr_is_rejected_case_insensitively() {
        let reg = registry();
        reg.seed_defaults().await.unwrap();
        let mut dup = DEFAULT_CATALOG[1].clone();
        dup.abbr = "el".into();
        assert!(matches!(
            reg.create(dup).await,
            Err(LeaveError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn lookup_by_kind_finds_loss_of_pay() {
        let reg = registry();
        reg.seed_defaults().await.unwrap();
        let lop = reg.get_by_kind(LeaveKind::LossOfPay).await.unwrap();
        assert!(lop.negative_balance_allowed);
        assert_eq!(lop.accrual_method, AccrualMethod::ManualCredit);
    }

    #[tokio::test]
    async fn delete_of_unreferenced_type_reports_clean() {
        let reg = registry();
        reg.seed_defaults().await.unwrap();
        let types = reg.list().await.unwrap();
        let outcome = reg.delete(types[0].id).await.unwrap();
        assert!(outcome.deleted);
        assert!(!outcome.referenced);
        assert_eq!(outcome.reference_count, 0);
    }

    #[tokio::test]
    async fn update_keeps_id_and_validates() {
        let reg = registry();
        reg.seed_defaults().await.unwrap();
        let el = reg.get_by_kind(LeaveKind::EarnedLeave).await.unwrap();
        let mut new = DEFAULT_CATALOG[0].clone();
        new.annual_entitlement = 18.0;
        let updated = reg.update(el.id, new).await.unwrap();
        assert_eq!(updated.id, el.id);
        assert_eq!(updated.annual_entitlement, 18.0);
    }
}
