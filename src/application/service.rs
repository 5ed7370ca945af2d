use crate::domain::lifecycle::PaymentEvent;
use crate::domain::payment::{PaymentId, PaymentRecord};
use crate::domain::ports::{MemberDirectoryBox, PaymentRepositoryBox};
use crate::domain::validator::{CreatePayment, PaymentValidator};
use crate::error::{PaymentError, Result};
use chrono::{NaiveDateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// How many times a transition is re-decided after losing a versioned save.
pub const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Entry point for everything that creates, settles, cancels or reads
/// payments.
///
/// `PaymentsService` owns its collaborators; there is no shared global
/// instance. Transitions run as read, decide, versioned save. A save that
/// loses against a concurrent writer is retried from a fresh read, so the
/// loser ends up with the ordinary state-machine error for the winner's state.
pub struct PaymentsService {
    repository: PaymentRepositoryBox,
    validator: PaymentValidator,
    members: Option<MemberDirectoryBox>,
}

impl PaymentsService {
    /// Creates a new `PaymentsService` instance.
    ///
    /// # Arguments
    ///
    /// * `repository` - The store for payment records.
    /// * `validator` - The creation rules, carrying the amount policy.
    pub fn new(repository: PaymentRepositoryBox, validator: PaymentValidator) -> Self {
        Self {
            repository,
            validator,
            members: None,
        }
    }

    /// Rejects payments for DNIs the directory does not know.
    pub fn with_member_directory(mut self, members: MemberDirectoryBox) -> Self {
        self.members = Some(members);
        self
    }

    pub async fn create_payment(&self, request: CreatePayment) -> Result<PaymentRecord> {
        let payment = self.validator.validate_creation(&request).inspect_err(|e| {
            warn!(reason = %e, "payment creation rejected");
        })?;

        if let Some(members) = &self.members
            && !members.is_member(&payment.user_dni).await?
        {
            warn!(user = %payment.user_dni, "payment creation for unknown member");
            return Err(PaymentError::NotFound(format!(
                "no member with dni: {} found",
                payment.user_dni
            )));
        }

        let record = PaymentRecord::new(payment, Utc::now().naive_utc());
        let stored = self.repository.save(record).await?;
        info!(
            id = %stored.id,
            user = %stored.user_dni,
            category = %stored.category,
            amount = %stored.amount,
            "payment created"
        );
        Ok(stored)
    }

    pub async fn cancel_payment(&self, id: PaymentId) -> Result<PaymentRecord> {
        self.transition(id, PaymentEvent::Cancel).await
    }

    /// Marks a payment as paid at `paid_at`, which may lie in the past.
    pub async fn mark_paid(
        &self,
        id: PaymentId,
        paid_at: Option<NaiveDateTime>,
    ) -> Result<PaymentRecord> {
        let paid_at = paid_at.ok_or_else(|| {
            PaymentError::InvalidArgument("payment date must not be null".to_string())
        })?;
        self.transition(id, PaymentEvent::MarkPaid(paid_at)).await
    }

    pub async fn find_payment(&self, id: PaymentId) -> Result<PaymentRecord> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| PaymentError::payment_not_found(id))
    }

    /// Payments of one member in creation order. Unknown members simply have
    /// none.
    pub async fn get_user_payments(&self, user_dni: Option<&str>) -> Result<Vec<PaymentRecord>> {
        let Some(user_dni) = user_dni.filter(|dni| !dni.trim().is_empty()) else {
            return Err(PaymentError::InvalidArgument("user dni must not be null".to_string()));
        };
        self.repository.find_by_user(user_dni).await
    }

    /// Every member that owns at least one payment, with their payments in
    /// creation order.
    pub async fn get_all_users_with_payments(
        &self,
    ) -> Result<BTreeMap<String, Vec<PaymentRecord>>> {
        let mut by_user: BTreeMap<String, Vec<PaymentRecord>> = BTreeMap::new();
        for record in self.repository.find_all().await? {
            by_user
                .entry(record.user_dni.clone())
                .or_default()
                .push(record);
        }
        Ok(by_user)
    }

    async fn transition(&self, id: PaymentId, event: PaymentEvent) -> Result<PaymentRecord> {
        let mut attempt = 1;
        loop {
            let mut record = self.find_payment(id).await?;
            let from = record.state;

            if let Err(e) = record.apply(event) {
                warn!(%id, state = %from, reason = %e, "payment transition rejected");
                return Err(e);
            }

            match self.repository.save(record).await {
                Ok(stored) => {
                    info!(%id, from = %from, to = %stored.state, "payment transition applied");
                    return Ok(stored);
                }
                Err(PaymentError::ConcurrentModification(_))
                    if attempt < MAX_TRANSITION_ATTEMPTS =>
                {
                    debug!(%id, attempt, "payment modified concurrently, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
