use entity::quota_days;
use entity_types::jiff_compat::JiffCivilDate;
use jiff::{Timestamp, civil::Date, tz::TimeZone};
use sea_orm::{
    ActiveModelTrait as _, ActiveValue::Set, ConnectionTrait, DbErr, EntityTrait as _,
    TransactionTrait, sea_query::OnConflict,
};

use super::{RepoError, now_ms};

pub struct QuotaDays;

impl QuotaDays {
    pub fn utc_today() -> Date {
        Timestamp::now().to_zoned(TimeZone::UTC).date()
    }

    /// Today's row, created on first touch of the UTC day. That insert is
    /// also what rolls the accounting over at midnight: the first call of a
    /// new day simply lands on a fresh primary key.
    pub async fn get_today<C: ConnectionTrait>(
        db: &C,
        quota_limit: i64,
    ) -> Result<quota_days::Model, RepoError> {
        let today = Self::utc_today();

        match quota_days::Entity::insert(quota_days::ActiveModel {
            date: Set(JiffCivilDate(today)),
            quota_used: Set(0),
            quota_limit: Set(quota_limit),
            operations_count: Set(0),
            per_operation_counts: Set(serde_json::json!({})),
            updated_at: Set(now_ms()),
        })
        .on_conflict(
            OnConflict::column(quota_days::Column::Date)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await
        {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(error) => return Err(error.into()),
        }

        quota_days::Entity::find_by_id(JiffCivilDate(today))
            .one(db)
            .await?
            .ok_or(RepoError::NotFound)
    }

    /// Add `cost` to today's spend and bump the per-operation counter, in
    /// one transaction. The read back out reflects the new totals.
    pub async fn increment_by<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        cost: i64,
        op_kind: &str,
        quota_limit: i64,
    ) -> Result<quota_days::Model, RepoError> {
        let txn = db.begin().await?;

        let today = Self::get_today(&txn, quota_limit).await?;

        let mut per_operation = today.per_operation_counts.clone();
        let counter = per_operation
            .as_object_mut()
            .map(|map| map.entry(op_kind).or_insert(serde_json::json!(0)));
        if let Some(counter) = counter {
            *counter = serde_json::json!(counter.as_i64().unwrap_or(0) + 1);
        }

        let quota_used = today.quota_used + cost;
        let operations_count = today.operations_count + 1;

        let mut row: quota_days::ActiveModel = today.into();
        row.quota_used = Set(quota_used);
        row.operations_count = Set(operations_count);
        row.per_operation_counts = Set(per_operation);
        row.updated_at = Set(now_ms());
        let updated = row.update(&txn).await?;

        txn.commit().await?;

        Ok(updated)
    }
}
