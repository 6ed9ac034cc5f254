//! Payment-intent-to-ledger reconciliation.
//!
//! `create_deposit` opens a payment intent with the processor and records it
//! as a pending ledger entry. `handle_event` consumes the processor's signed
//! webhook and moves the matching entry to `completed`.
//!
//! The intent and the ledger row live in two systems that cannot be written
//! atomically. When the ledger write fails after the intent exists, the intent
//! is still returned to the caller and the failure is logged; the webhook path
//! tolerates the missing row.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{TransactionRecord, TransactionStatus};
use crate::gateway::{
    GatewayError, PaymentGateway, PaymentIntent, PaymentIntentObject, SignatureError, StripeEvent,
};
use crate::ports::{AccountStore, LedgerStore, StoreError};
use crate::validation::{validate_positive_amount, validate_required, ValidationError};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("{0}")]
    MalformedEvent(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationError> for ReconcileError {
    fn from(err: ValidationError) -> Self {
        ReconcileError::Validation(err.to_string())
    }
}

/// What a verified webhook delivery did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Event type this service does not act on.
    Ignored,
    /// No ledger record carries the event's payment id.
    Unmatched,
    /// The record moved from pending to completed.
    Completed,
    /// The record was already terminal; nothing changed.
    AlreadyFinal,
    /// The record belongs to a different user than the event's tag; left untouched.
    OwnerMismatch,
    /// The ledger could not be read or written. Logged for repair, not retried.
    StoreUnavailable,
}

pub struct Reconciler {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn LedgerStore>,
    accounts: Arc<dyn AccountStore>,
    currency: String,
}

impl Reconciler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn LedgerStore>,
        accounts: Arc<dyn AccountStore>,
        currency: String,
    ) -> Self {
        Self {
            gateway,
            ledger,
            accounts,
            currency,
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Opens a top-up for `user_id` and records it as pending.
    ///
    /// Every call creates a new intent; deposits are not deduplicated by user or amount.
    #[tracing::instrument(skip(self))]
    pub async fn create_deposit(
        &self,
        user_id: &str,
        amount_minor: i64,
    ) -> Result<PaymentIntent, ReconcileError> {
        let user_id = user_id.trim();
        validate_required("user_id", user_id)?;
        validate_positive_amount(amount_minor)?;

        if !self.accounts.exists(user_id).await? {
            return Err(ReconcileError::NotFound(format!("User {} not found", user_id)));
        }

        let intent = self
            .gateway
            .create_intent(user_id, amount_minor)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Payment intent creation failed");
                e
            })?;

        let record = TransactionRecord::pending_deposit(
            user_id.to_string(),
            amount_minor,
            self.currency.clone(),
            intent.payment_id.clone(),
        );
        self.record_pending(&record).await;

        tracing::info!(
            payment_id = %intent.payment_id,
            "Payment intent created"
        );
        Ok(intent)
    }

    /// Writes the pending row. Failures are logged, never returned: the intent
    /// already exists remotely and the caller needs its client secret.
    async fn record_pending(&self, record: &TransactionRecord) {
        let payment_id = record.payment_id.as_deref().unwrap_or_default();

        match self.ledger.create_record(record).await {
            Ok(stored) => {
                tracing::debug!(
                    transaction_id = %stored.transaction_id,
                    payment_id,
                    "Ledger record created"
                );
            }
            Err(StoreError::DuplicateKey(_)) => self.inspect_duplicate(record).await,
            Err(e) => {
                tracing::error!(
                    payment_id,
                    user_id = %record.user_id,
                    error = %e,
                    "Failed to write ledger record; payment intent kept without one"
                );
            }
        }
    }

    async fn inspect_duplicate(&self, record: &TransactionRecord) {
        let payment_id = record.payment_id.as_deref().unwrap_or_default();

        match self.ledger.find_by_payment_id(payment_id).await {
            Ok(existing)
                if existing.user_id == record.user_id
                    && existing.amount == record.amount
                    && existing.kind == record.kind =>
            {
                tracing::info!(
                    payment_id,
                    transaction_id = %existing.transaction_id,
                    "Ledger record for payment already present"
                );
            }
            Ok(existing) => {
                tracing::error!(
                    payment_id,
                    existing_user_id = %existing.user_id,
                    existing_amount = %existing.amount,
                    user_id = %record.user_id,
                    amount = %record.amount,
                    "Conflicting ledger record for payment id"
                );
            }
            Err(e) => {
                tracing::error!(
                    payment_id,
                    error = %e,
                    "Duplicate payment id reported but existing record unreadable"
                );
            }
        }
    }

    /// Authenticates and applies one webhook delivery.
    ///
    /// Signature verification happens before the body is interpreted. Once an
    /// event is authenticated and parsed it is acknowledged, including unknown
    /// users, unknown payment ids, owner mismatches and store outages; a
    /// processor retry cannot fix any of those. Only bad signatures, unparseable
    /// bodies, a missing owner tag and a record vanishing mid-update are errors.
    pub async fn handle_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome, ReconcileError> {
        if let Err(e) = self.gateway.verify_signature(payload, signature_header) {
            tracing::warn!(error = %e, "Rejected webhook: signature verification failed");
            return Err(e.into());
        }

        let event = StripeEvent::parse(payload).map_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook: unparseable event");
            ReconcileError::MalformedEvent(format!("Invalid event payload: {}", e))
        })?;

        tracing::info!(
            event_type = event.event_type(),
            event_id = event.event_id().unwrap_or("-"),
            "Received Stripe webhook event"
        );

        match event {
            StripeEvent::PaymentIntentSucceeded { intent, .. } => self.confirm_payment(&intent).await,
            StripeEvent::Other { .. } => Ok(WebhookOutcome::Ignored),
        }
    }

    async fn confirm_payment(
        &self,
        intent: &PaymentIntentObject,
    ) -> Result<WebhookOutcome, ReconcileError> {
        let payment_id = intent.id.as_str();
        let user_id = intent.user_id().ok_or_else(|| {
            ReconcileError::Validation(format!(
                "Payment intent {} has no user_id metadata",
                payment_id
            ))
        })?;

        match self.accounts.get_by_id(user_id).await {
            Ok(account) => {
                tracing::info!(
                    payment_id,
                    user_id,
                    login = %account.login,
                    amount_minor = intent.amount,
                    "Payment succeeded"
                );
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(payment_id, user_id, "Payment succeeded for unknown user");
            }
            Err(e) => {
                tracing::warn!(payment_id, user_id, error = %e, "Account lookup failed; continuing");
            }
        }

        let record = match self.ledger.find_by_payment_id(payment_id).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(payment_id, "No ledger record for succeeded payment");
                return Ok(WebhookOutcome::Unmatched);
            }
            Err(e) => {
                tracing::error!(
                    payment_id,
                    user_id,
                    error = %e,
                    "Ledger lookup failed for succeeded payment; record left for repair"
                );
                return Ok(WebhookOutcome::StoreUnavailable);
            }
        };

        if record.user_id != user_id {
            tracing::error!(
                payment_id,
                transaction_id = %record.transaction_id,
                record_user_id = %record.user_id,
                event_user_id = user_id,
                "Ledger record owner does not match payment metadata; record left untouched"
            );
            return Ok(WebhookOutcome::OwnerMismatch);
        }

        if record.status.is_terminal() {
            tracing::info!(
                payment_id,
                status = %record.status,
                "Ledger record already final; duplicate delivery ignored"
            );
            return Ok(WebhookOutcome::AlreadyFinal);
        }

        match self
            .ledger
            .update_status(record.transaction_id, TransactionStatus::Completed)
            .await
        {
            Ok(change) if change.applied => {
                tracing::info!(
                    payment_id,
                    transaction_id = %change.record.transaction_id,
                    "Ledger record completed"
                );
                Ok(WebhookOutcome::Completed)
            }
            Ok(change) => {
                tracing::info!(
                    payment_id,
                    status = %change.record.status,
                    "Ledger record finalized by a concurrent delivery"
                );
                Ok(WebhookOutcome::AlreadyFinal)
            }
            Err(StoreError::NotFound(what)) => Err(ReconcileError::Invariant(format!(
                "ledger record disappeared during update: {}",
                what
            ))),
            Err(e) => {
                tracing::error!(
                    payment_id,
                    transaction_id = %record.transaction_id,
                    error = %e,
                    "Failed to complete ledger record; record left for repair"
                );
                Ok(WebhookOutcome::StoreUnavailable)
            }
        }
    }

    /// Transaction history for `user_id`, newest first.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, ReconcileError> {
        let user_id = user_id.trim();
        validate_required("user_id", user_id)?;

        if !self.accounts.exists(user_id).await? {
            return Err(ReconcileError::NotFound(format!("User {} not found", user_id)));
        }

        Ok(self.ledger.list_by_user(user_id, limit).await?)
    }
}
