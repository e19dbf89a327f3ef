use sea_orm::sea_query::{Expr, OnConflict};
use serde::Serialize;

use crate::{
  entity::{JobStatus, commission_job},
  prelude::*,
  sv::Commission,
  utils,
};

/// Upper bound for a single retry delay.
const MAX_BACKOFF_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainReport {
  pub done: usize,
  pub retried: usize,
  pub dead: usize,
  /// Claimed by another worker first.
  pub skipped: usize,
}

/// Commission outbox. Jobs are written with their order and drained by the
/// background worker until they succeed or run out of attempts.
pub struct Jobs<'a> {
  db: &'a DatabaseConnection,
  max_attempts: i32,
  backoff_base: u64,
  batch: u64,
  lease: Duration,
}

impl<'a> Jobs<'a> {
  pub fn new(db: &'a DatabaseConnection, config: &Config) -> Self {
    Self {
      db,
      max_attempts: config.commission_max_attempts,
      backoff_base: config.commission_backoff_base_secs,
      batch: config.commission_batch,
      lease: config.commission_claim_lease,
    }
  }

  pub async fn enqueue<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
  ) -> Result<()> {
    let now = utils::now();

    commission_job::Entity::insert(commission_job::ActiveModel {
      id: NotSet,
      order_id: Set(order_id),
      status: Set(JobStatus::Pending),
      attempts: Set(0),
      last_error: Set(None),
      available_at: Set(now),
      created_at: Set(now),
      updated_at: Set(now),
    })
    .on_conflict(
      OnConflict::column(commission_job::Column::OrderId)
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    Ok(())
  }

  pub async fn drain_once(&self) -> Result<DrainReport> {
    let now = utils::now();
    let mut report = DrainReport::default();

    let due = commission_job::Entity::find()
      .filter(commission_job::Column::Status.eq(JobStatus::Pending))
      .filter(commission_job::Column::AvailableAt.lte(now))
      .order_by_asc(commission_job::Column::AvailableAt)
      .order_by_asc(commission_job::Column::Id)
      .limit(self.batch)
      .all(self.db)
      .await?;

    for job in due {
      if !self.claim(&job, now).await? {
        report.skipped += 1;
        continue;
      }

      let attempts = job.attempts + 1;
      match self.run(&job).await {
        Ok(()) => report.done += 1,
        Err(err) => {
          let reason = err.to_string();
          match self.fail(job.id, attempts, &reason).await? {
            JobStatus::Dead => report.dead += 1,
            _ => report.retried += 1,
          }
        }
      }
    }

    if report != DrainReport::default() {
      debug!("Commission jobs drained: {:?}", report);
    }
    Ok(report)
  }

  /// Takes the job by bumping `attempts` and pushing `available_at` past
  /// the lease. Fails if someone else bumped it first.
  async fn claim(
    &self,
    job: &commission_job::Model,
    now: DateTime,
  ) -> Result<bool> {
    let lease =
      TimeDelta::from_std(self.lease).unwrap_or(TimeDelta::minutes(1));

    let res = commission_job::Entity::update_many()
      .col_expr(
        commission_job::Column::Attempts,
        Expr::col(commission_job::Column::Attempts).add(1),
      )
      .col_expr(commission_job::Column::AvailableAt, Expr::value(now + lease))
      .col_expr(commission_job::Column::UpdatedAt, Expr::value(now))
      .filter(commission_job::Column::Id.eq(job.id))
      .filter(commission_job::Column::Status.eq(JobStatus::Pending))
      .filter(commission_job::Column::Attempts.eq(job.attempts))
      .exec(self.db)
      .await?;

    Ok(res.rows_affected == 1)
  }

  async fn run(&self, job: &commission_job::Model) -> Result<()> {
    let txn = self.db.begin().await?;

    Commission::calculate_in(&txn, job.order_id).await?;

    commission_job::Entity::update_many()
      .set(commission_job::ActiveModel {
        status: Set(JobStatus::Done),
        last_error: Set(None),
        updated_at: Set(utils::now()),
        ..Default::default()
      })
      .filter(commission_job::Column::Id.eq(job.id))
      .exec(&txn)
      .await?;

    txn.commit().await?;
    Ok(())
  }

  /// Records a failed attempt. Schedules a retry after `base^attempts`
  /// seconds or parks the job as dead once attempts are exhausted.
  pub async fn fail(
    &self,
    job_id: i32,
    attempts: i32,
    reason: &str,
  ) -> Result<JobStatus> {
    let now = utils::now();

    let (status, available_at) = if attempts >= self.max_attempts {
      error!(
        "Commission job #{} dead after {} attempts: {}",
        job_id, attempts, reason
      );
      (JobStatus::Dead, now)
    } else {
      let delay = self.backoff(attempts);
      warn!(
        "Commission job #{} failed (attempt {}), retry in {}s: {}",
        job_id, attempts, delay, reason
      );
      (JobStatus::Pending, now + TimeDelta::seconds(delay as i64))
    };

    commission_job::Entity::update_many()
      .set(commission_job::ActiveModel {
        status: Set(status),
        attempts: Set(attempts),
        last_error: Set(Some(reason.to_string())),
        available_at: Set(available_at),
        updated_at: Set(now),
        ..Default::default()
      })
      .filter(commission_job::Column::Id.eq(job_id))
      .exec(self.db)
      .await?;

    Ok(status)
  }

  fn backoff(&self, attempts: i32) -> u64 {
    self
      .backoff_base
      .saturating_pow(attempts.max(0) as u32)
      .min(MAX_BACKOFF_SECS)
  }

  /// Revives a dead job with a fresh attempt budget.
  pub async fn requeue(&self, job_id: i32) -> Result<commission_job::Model> {
    let job = commission_job::Entity::find_by_id(job_id)
      .one(self.db)
      .await?
      .ok_or(Error::JobNotFound)?;

    if job.status != JobStatus::Dead {
      return Err(Error::InvalidState(format!(
        "Commission job #{} is {:?}, only dead jobs can be requeued",
        job.id, job.status
      )));
    }

    let now = utils::now();
    let job = commission_job::ActiveModel {
      status: Set(JobStatus::Pending),
      attempts: Set(0),
      last_error: Set(None),
      available_at: Set(now),
      updated_at: Set(now),
      ..job.into()
    }
    .update(self.db)
    .await?;

    info!("Commission job #{} requeued for order #{}", job.id, job.order_id);
    Ok(job)
  }

  pub async fn dead_letters(&self) -> Result<Vec<commission_job::Model>> {
    Ok(
      commission_job::Entity::find()
        .filter(commission_job::Column::Status.eq(JobStatus::Dead))
        .order_by_asc(commission_job::Column::UpdatedAt)
        .all(self.db)
        .await?,
    )
  }

  pub async fn by_order(
    &self,
    order_id: i32,
  ) -> Result<commission_job::Model> {
    commission_job::Entity::find()
      .filter(commission_job::Column::OrderId.eq(order_id))
      .one(self.db)
      .await?
      .ok_or(Error::JobNotFound)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::commission,
    sv::test_utils::{seed, test_db},
  };

  #[tokio::test]
  async fn test_enqueue_once_per_order() {
    let db = test_db::setup().await;
    let order = seed::order(&db, None, &[]).await;

    Jobs::enqueue(&db, order.id).await.unwrap();
    Jobs::enqueue(&db, order.id).await.unwrap();

    let jobs = commission_job::Entity::find().all(&db).await.unwrap();
    assert_eq!(jobs.len(), 1);
  }

  #[tokio::test]
  async fn test_drain_calculates_commissions() {
    let db = test_db::setup().await;
    let config = Config::default();
    let order =
      seed::order(&db, None, &[(1, Some(7), 2, 15_000, 10_000, 6_000)]).await;
    Jobs::enqueue(&db, order.id).await.unwrap();
    let sv = Jobs::new(&db, &config);

    let report = sv.drain_once().await.unwrap();
    assert_eq!(report, DrainReport { done: 1, ..Default::default() });

    let job = sv.by_order(order.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.attempts, 1);

    let rows = commission::Entity::find()
      .filter(commission::Column::OrderId.eq(order.id))
      .all(&db)
      .await
      .unwrap();
    assert_eq!(rows.iter().map(|row| row.amount).sum::<i64>(), 30_000);

    // nothing left to do
    assert_eq!(sv.drain_once().await.unwrap(), DrainReport::default());
  }

  #[tokio::test]
  async fn test_failure_backs_off_then_dead_letters() {
    let db = test_db::setup().await;
    let config = Config::default();
    let order = seed::order(&db, None, &[]).await;
    Jobs::enqueue(&db, order.id).await.unwrap();
    let sv = Jobs::new(&db, &config);
    let job = sv.by_order(order.id).await.unwrap();

    let status = sv.fail(job.id, 1, "database is locked").await.unwrap();
    assert_eq!(status, JobStatus::Pending);

    let retried = sv.by_order(order.id).await.unwrap();
    assert!(retried.available_at > utils::now());
    assert_eq!(retried.last_error.as_deref(), Some("database is locked"));
    // not due yet
    assert_eq!(sv.drain_once().await.unwrap(), DrainReport::default());

    let status = sv
      .fail(job.id, config.commission_max_attempts, "still locked")
      .await
      .unwrap();
    assert_eq!(status, JobStatus::Dead);
    assert_eq!(sv.dead_letters().await.unwrap().len(), 1);

    let revived = sv.requeue(job.id).await.unwrap();
    assert_eq!(revived.status, JobStatus::Pending);
    assert_eq!(revived.attempts, 0);
    assert!(sv.dead_letters().await.unwrap().is_empty());

    assert_eq!(sv.drain_once().await.unwrap().done, 1);
  }

  #[tokio::test]
  async fn test_requeue_only_dead_jobs() {
    let db = test_db::setup().await;
    let config = Config::default();
    let order = seed::order(&db, None, &[]).await;
    Jobs::enqueue(&db, order.id).await.unwrap();
    let sv = Jobs::new(&db, &config);
    let job = sv.by_order(order.id).await.unwrap();

    let err = sv.requeue(job.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(matches!(sv.requeue(999).await.unwrap_err(), Error::JobNotFound));
  }

  #[test]
  fn test_backoff_is_exponential_and_capped() {
    let db = DatabaseConnection::Disconnected;
    let config = Config::default();
    let sv = Jobs::new(&db, &config);

    assert_eq!(sv.backoff(1), 2);
    assert_eq!(sv.backoff(3), 8);
    assert_eq!(sv.backoff(60), MAX_BACKOFF_SECS);
  }
}
