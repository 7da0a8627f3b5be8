//! Durable markers for the second step of two-document operations.
//!
//! Order writes and their follow-up writes (cart clear, delivery roster) are
//! separate single-document writes. When the follow-up fails, a
//! `ReconciliationTask` is stored and the caller carries on; an admin replays
//! outstanding tasks with `POST /admin/reconcile`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{DeliveryPerson, User};
use crate::domain::value_objects::{DeliveryPersonId, OrderId, TaskId, UserId};
use crate::error::Result;
use crate::services::cart::CartSync;
use crate::store::{Document, Repository, StoreError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PendingStep {
    ClearCart { user_id: UserId },
    AssignDelivery { order_id: OrderId, delivery_person_id: DeliveryPersonId },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationTask {
    id: TaskId,
    step: PendingStep,
    last_error: String,
    attempts: u32,
    created_at: DateTime<Utc>,
}

impl ReconciliationTask {
    pub fn id(&self) -> TaskId { self.id }
    pub fn step(&self) -> &PendingStep { &self.step }
    pub fn attempts(&self) -> u32 { self.attempts }
}

impl Document for ReconciliationTask {
    const COLLECTION: &'static str = "reconciliation_tasks";
    fn document_id(&self) -> String { self.id.to_string() }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub resolved: usize,
    pub remaining: usize,
}

#[derive(Clone)]
pub struct SagaLog {
    repo: Repository,
    carts: CartSync,
}

impl SagaLog {
    pub fn new(repo: Repository, carts: CartSync) -> Self { Self { repo, carts } }

    /// Stores a marker for a failed follow-up step. Never fails the caller.
    pub async fn record(&self, step: PendingStep, error: &StoreError) {
        tracing::error!(step = ?step, error = %error, "Follow-up write failed, recording reconciliation task");
        let task = ReconciliationTask { id: TaskId::new(), step, last_error: error.to_string(), attempts: 0, created_at: Utc::now() };
        if let Err(e) = self.repo.insert(&task).await {
            tracing::error!(task_id = %task.id, step = ?task.step, error = %e, "Failed to store reconciliation task");
        }
    }

    pub async fn pending(&self) -> Result<Vec<ReconciliationTask>> {
        let mut tasks = self.repo.all::<ReconciliationTask>().await?;
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    /// Attempts every outstanding task once. Resolved tasks are removed.
    pub async fn replay(&self) -> Result<ReplayReport> {
        let mut report = ReplayReport::default();
        for task in self.pending().await? {
            match self.apply(&task.step).await {
                Ok(()) => {
                    self.repo.delete::<ReconciliationTask>(&task.id).await?;
                    tracing::info!(task_id = %task.id, step = ?task.step, "Reconciliation task resolved");
                    report.resolved += 1;
                }
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "Reconciliation task still failing");
                    let message = e.to_string();
                    self.repo
                        .update::<ReconciliationTask, _, _>(&task.id, move |t| {
                            t.attempts += 1;
                            t.last_error = message;
                        })
                        .await?;
                    report.remaining += 1;
                }
            }
        }
        Ok(report)
    }

    /// Applies one step. A target that no longer exists counts as done.
    pub(crate) async fn apply(&self, step: &PendingStep) -> std::result::Result<(), StoreError> {
        match step {
            PendingStep::ClearCart { user_id } => {
                self.carts.discard(user_id).await;
                if self.repo.update::<User, _, _>(user_id, User::clear_cart).await?.is_none() {
                    tracing::debug!(user_id = %user_id, "Cart clear skipped, user no longer exists");
                }
            }
            PendingStep::AssignDelivery { order_id, delivery_person_id } => {
                let order_id = *order_id;
                if self.repo.update::<DeliveryPerson, _, _>(delivery_person_id, move |d| d.assign(order_id)).await?.is_none() {
                    tracing::debug!(delivery_person_id = %delivery_person_id, "Roster update skipped, delivery person no longer exists");
                }
            }
        }
        Ok(())
    }
}
