//! Holiday Calendar: named non-working days plus a per-year date-set cache
//! consulted by the working-day calculator on every submission.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use moka::future::Cache;

use crate::error::{LeaveError, LeaveResult};
use crate::model::{HolidayType, PublicHoliday};
use crate::store::Store;

/// Create/update payload for a holiday.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct NewHoliday {
    #[schema(example = "Republic Day")]
    pub name: String,
    #[schema(example = "2025-01-26", value_type = String, format = "date")]
    pub holiday_date: NaiveDate,
    pub holiday_type: HolidayType,
    #[serde(default)]
    pub is_restricted: bool,
    #[serde(default)]
    pub recurring: bool,
    pub description: Option<String>,
}

pub struct HolidayCalendar {
    store: Arc<Store>,
    /// year -> set of holiday dates. Invalidated on any CRUD for that year.
    year_cache: Cache<i32, Arc<HashSet<NaiveDate>>>,
}

impl HolidayCalendar {
    pub fn new(store: Arc<Store>) -> Self {
        HolidayCalendar {
            store,
            year_cache: Cache::builder().max_capacity(64).build(),
        }
    }

    pub async fn list(&self, year: i32) -> LeaveResult<Vec<PublicHoliday>> {
        self.store.list_holidays(year).await
    }

    async fn dates_for_year(&self, year: i32) -> LeaveResult<Arc<HashSet<NaiveDate>>> {
        if let Some(dates) = self.year_cache.get(&year).await {
            return Ok(dates);
        }
        let holidays = self.store.list_holidays(year).await?;
        let dates: Arc<HashSet<NaiveDate>> =
            Arc::new(holidays.into_iter().map(|h| h.holiday_date).collect());
        self.year_cache.insert(year, dates.clone()).await;
        Ok(dates)
    }

    /// Union of holiday dates over the years a request spans.
    pub async fn dates_for_years(&self, years: &[i32]) -> LeaveResult<HashSet<NaiveDate>> {
        let sets =
            futures_util::future::join_all(years.iter().map(|year| self.dates_for_year(*year)))
                .await;
        let mut all = HashSet::new();
        for set in sets {
            all.extend(set?.iter().copied());
        }
        Ok(all)
    }

    pub async fn is_holiday(&self, date: NaiveDate) -> LeaveResult<bool> {
        Ok(self.dates_for_year(date.year()).await?.contains(&date))
    }

    pub async fn create(&self, new: NewHoliday) -> LeaveResult<PublicHoliday> {
        let mut holiday = PublicHoliday {
            id: 0,
            name: new.name,
            holiday_date: new.holiday_date,
            holiday_type: new.holiday_type,
            is_restricted: new.is_restricted,
            recurring: new.recurring,
            description: new.description,
            created_at: Utc::now(),
        };
        if holiday.name.trim().is_empty() {
            return Err(LeaveError::validation("holiday name is required"));
        }
        holiday.id = self.store.insert_holiday(&holiday).await?;
        self.year_cache
            .invalidate(&holiday.holiday_date.year())
            .await;
        Ok(holiday)
    }

    pub async fn update(&self, id: u64, new: NewHoliday) -> LeaveResult<PublicHoliday> {
        let existing = self
            .store
            .get_holiday(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("holiday"))?;
        let updated = PublicHoliday {
            id,
            name: new.name,
            holiday_date: new.holiday_date,
            holiday_type: new.holiday_type,
            is_restricted: new.is_restricted,
            recurring: new.recurring,
            description: new.description,
            created_at: existing.created_at,
        };
        if !self.store.update_holiday(&updated).await? {
            return Err(LeaveError::not_found("holiday"));
        }
        // The date may have moved across a year boundary.
        self.year_cache
            .invalidate(&existing.holiday_date.year())
            .await;
        self.year_cache
            .invalidate(&updated.holiday_date.year())
            .await;
        Ok(updated)
    }

    /// Past applications keep the day counts they were computed with; only
    /// future lookups see the deletion.
    pub async fn delete(&self, id: u64) -> LeaveResult<()> {
        let existing = self
            .store
            .get_holiday(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("holiday"))?;
        self.store.delete_holiday(id).await?;
        self.year_cache
            .invalidate(&existing.holiday_date.year())
            .await;
        Ok(())
    }

    /// Pre-load the current year's date set at startup.
    pub async fn warmup(&self, year: i32) -> anyhow::Result<()> {
        let dates = self.dates_for_year(year).await?;
        log::info!(
            "Holiday calendar warmup complete: {} dates for {}",
            dates.len(),
            year
        );
        Ok(())
    }
}
