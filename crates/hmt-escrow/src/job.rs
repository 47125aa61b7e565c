use crate::context::EscrowContext;
use crate::error::{JobError, Result};
use crate::events::{JobEvent, JobEventKind};
use crate::manifest::{JobTerms, Manifest};
use chrono::Utc;
use hmt_chain::{BulkPayoutCall, CallOptions, ChainError, EscrowSetup, TxOptions, TxReceipt, BULK_MAX_COUNT};
use hmt_crypto::{Credentials, PrivateKey, PublicKey};
use hmt_storage::PayloadRef;
use hmt_types::{Address, HmtAmount, JobStatus};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// `txId` argument of `bulkPayOut`.
const PAYOUT_TX_ID: u64 = 1;

/// Outcome of [`Job::bulk_payout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPayout {
    /// Whether the escrow moved the funds. A mined transaction with
    /// `transferred == false` means the contract refused the batch,
    /// typically because it exceeds the escrow balance.
    pub transferred: bool,
    pub final_results: PayloadRef,
    pub receipt: TxReceipt,
}

/// A job on the HUMAN escrow contracts.
///
/// Lifecycle: `launch` deploys the escrow and uploads the manifest,
/// `setup` funds it and registers the oracles, `bulk_payout` pays
/// workers until the escrow is `Paid`, `complete` closes it. `cancel`
/// and `abort` refund the gas payer while the escrow is still
/// `Launched` or `Pending`.
///
/// Mutating calls take `&mut self`, so a single `Job` is driven by one
/// task at a time. Two `Job` values bound to the same escrow are not
/// coordinated; serialising them is up to the caller.
pub struct Job {
    ctx: EscrowContext,
    credentials: Credentials,
    factory: Address,
    escrow: Option<Address>,
    manifest: Manifest,
    terms: JobTerms,
    amount: HmtAmount,
    manifest_ref: Option<PayloadRef>,
    intermediate_results: Option<PayloadRef>,
    final_results: Option<PayloadRef>,
    events: Option<mpsc::UnboundedSender<JobEvent>>,
}

impl Job {
    /// Prepare a new job from a manifest.
    ///
    /// Without a factory address a fresh factory is deployed. Nothing
    /// else touches the chain until [`Job::launch`].
    pub async fn new(
        ctx: EscrowContext,
        credentials: Credentials,
        manifest: Manifest,
        factory: Option<Address>,
    ) -> Result<Self> {
        let terms = manifest.terms()?;
        let amount = terms.amount_base_units()?;

        let mut job = Self {
            ctx,
            credentials,
            factory: Address::ZERO,
            escrow: None,
            manifest,
            terms,
            amount,
            manifest_ref: None,
            intermediate_results: None,
            final_results: None,
            events: None,
        };

        job.factory = match factory {
            Some(address) => {
                if job.ctx.gateway().code_at(address).await?.is_empty() {
                    return Err(JobError::Configuration(format!(
                        "no factory contract at {}",
                        address
                    )));
                }
                address
            }
            None => {
                let address = job
                    .submit("deploy_factory", job.ctx.gateway().deploy_factory(job.tx(None)))
                    .await?;
                info!(factory = %address, gas_payer = %job.gas_payer(), "🏭 Factory deployed");
                address
            }
        };

        debug!(
            factory = %job.factory,
            amount = job.amount.to_base_units(),
            "Job prepared"
        );
        Ok(job)
    }

    /// Bind to an escrow that already exists under `factory`.
    ///
    /// The manifest is fetched from the escrow's on-chain reference,
    /// decrypted with `key` and checked against the on-chain hash.
    pub async fn attach(
        ctx: EscrowContext,
        credentials: Credentials,
        factory: Address,
        escrow: Address,
        key: &PrivateKey,
    ) -> Result<Self> {
        let gateway = ctx.gateway().clone();
        let call = CallOptions::new(credentials.gas_payer(), ctx.config().gas_limit);

        if !gateway.has_escrow(factory, escrow, call).await? {
            return Err(JobError::Configuration(format!(
                "factory {} doesn't contain escrow {}",
                factory, escrow
            )));
        }

        let url = gateway.manifest_url(escrow, call).await?;
        if url.is_empty() {
            return Err(JobError::State(format!(
                "escrow {} has no manifest reference yet",
                escrow
            )));
        }
        let hash = gateway.manifest_hash(escrow, call).await?;
        let manifest: Manifest = ctx.payloads().download_verified(&url, &hash, key).await?;
        let terms = manifest.terms()?;
        let amount = terms.amount_base_units()?;

        let intermediate_url = gateway.intermediate_results_url(escrow, call).await?;
        let intermediate_results = if intermediate_url.is_empty() {
            None
        } else {
            Some(PayloadRef {
                hash: gateway.intermediate_results_hash(escrow, call).await?,
                url: intermediate_url,
            })
        };

        info!(escrow = %escrow, factory = %factory, manifest_url = %url, "🔗 Attached to escrow");

        Ok(Self {
            ctx,
            credentials,
            factory,
            escrow: Some(escrow),
            manifest,
            terms,
            amount,
            manifest_ref: Some(PayloadRef { hash, url }),
            intermediate_results,
            final_results: None,
            events: None,
        })
    }

    /// Emit a [`JobEvent`] after every successful operation.
    pub fn with_events(mut self) -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        (self, rx)
    }

    /// Deploy the escrow and upload the manifest for `recipient`.
    ///
    /// The manifest goes to storage first so a storage outage costs no
    /// gas. Returns whether the new escrow reads `Launched` with a zero
    /// balance.
    pub async fn launch(&mut self, recipient: &PublicKey, gas: Option<u64>) -> Result<bool> {
        if let Some(escrow) = self.escrow {
            return Err(JobError::State(format!(
                "The escrow has been already deployed at {}",
                escrow
            )));
        }

        let start = Instant::now();
        let manifest_ref = self.ctx.payloads().upload(&self.manifest, recipient).await?;

        let receipt = self
            .submit(
                "create_escrow",
                self.ctx.gateway().create_escrow(self.factory, self.tx(gas)),
            )
            .await?;
        let escrow = match receipt.contract_address {
            Some(address) => address,
            None => self.ctx.gateway().last_escrow(self.factory, self.call()).await?,
        };

        self.escrow = Some(escrow);
        self.manifest_ref = Some(manifest_ref);

        let status = self.read_status(escrow).await?;
        let balance = self.balance().await?;

        info!(
            escrow = %escrow,
            factory = %self.factory,
            manifest_url = %self.manifest_ref.as_ref().map(|r| r.url.as_str()).unwrap_or_default(),
            status = %status,
            block = receipt.block_number,
            duration_ms = start.elapsed().as_millis() as u64,
            "🚀 Job launched"
        );
        self.emit(JobEventKind::Launched, Some(status));

        Ok(status == JobStatus::Launched && balance.is_zero())
    }

    /// Fund the escrow with `amount` HMT and register oracles, stakes and
    /// the manifest reference. Returns whether the escrow reads `Pending`
    /// holding exactly `amount`.
    pub async fn setup(&mut self, gas: Option<u64>) -> Result<bool> {
        let escrow = self.bound()?;
        let before = self
            .require_status(escrow, "setup", |s| s == JobStatus::Launched)
            .await?;
        let manifest_ref = self
            .manifest_ref
            .clone()
            .ok_or_else(|| JobError::State("manifest has not been uploaded".to_string()))?;

        let start = Instant::now();
        // A retried setup tops up only what an earlier attempt left missing.
        let funded = self.balance().await?;
        let shortfall = self.amount.saturating_sub(funded);
        if shortfall.is_zero() {
            debug!(escrow = %escrow, funded = funded.to_base_units(), "Escrow already funded");
        } else {
            self.submit(
                "transfer",
                self.ctx.gateway().transfer_hmt(escrow, shortfall, self.tx(gas)),
            )
            .await?;
        }

        let stake = self.terms.oracle_stake_percent();
        let args = EscrowSetup {
            reputation_oracle: self.terms.reputation_oracle,
            recording_oracle: self.terms.recording_oracle,
            reputation_oracle_stake: stake,
            recording_oracle_stake: stake,
            manifest_url: manifest_ref.url,
            manifest_hash: manifest_ref.hash,
        };
        self.submit("setup", self.ctx.gateway().setup(escrow, &args, self.tx(gas)))
            .await?;

        let status = self.read_status(escrow).await?;
        let balance = self.balance().await?;

        info!(
            escrow = %escrow,
            amount = self.amount.to_base_units(),
            balance = balance.to_base_units(),
            oracle_stake = stake,
            status_before = %before,
            status_after = %status,
            duration_ms = start.elapsed().as_millis() as u64,
            "💰 Escrow funded and set up"
        );
        self.emit(JobEventKind::SetUp, Some(status));

        Ok(status == JobStatus::Pending && balance == self.amount)
    }

    /// Upload intermediate results for `recipient` and record the
    /// reference on chain. Returns whether the escrow now points at them.
    pub async fn store_intermediate_results<T: Serialize>(
        &mut self,
        results: &T,
        recipient: &PublicKey,
        gas: Option<u64>,
    ) -> Result<bool> {
        let escrow = self.bound()?;
        let reference = self.ctx.payloads().upload(results, recipient).await?;

        self.submit(
            "store_results",
            self.ctx
                .gateway()
                .store_results(escrow, &reference.url, &reference.hash, self.tx(gas)),
        )
        .await?;

        let stored = self
            .ctx
            .gateway()
            .intermediate_results_url(escrow, self.call())
            .await?
            == reference.url;
        let status = self.read_status(escrow).await?;

        info!(escrow = %escrow, url = %reference.url, hash = %reference.hash, "📝 Intermediate results stored");
        self.intermediate_results = Some(reference);
        self.emit(JobEventKind::IntermediateResultsStored, Some(status));

        Ok(stored)
    }

    /// Pay `payouts` (address, HMT) out of the escrow and publish the
    /// final results for `recipient`.
    ///
    /// An over-balance batch is not an error: the transaction is mined,
    /// the contract ignores it and the result says `transferred: false`.
    pub async fn bulk_payout<T: Serialize>(
        &mut self,
        payouts: &[(Address, Decimal)],
        results: &T,
        recipient: &PublicKey,
        gas: Option<u64>,
    ) -> Result<BulkPayout> {
        let escrow = self.bound()?;
        let (recipients, amounts) = to_base_units(payouts)?;
        let before = self
            .require_status(escrow, "bulk_payout", JobStatus::accepts_payouts)
            .await?;

        let start = Instant::now();
        let final_results = self.ctx.payloads().upload(results, recipient).await?;
        let total = HmtAmount::checked_sum(amounts.iter()).unwrap_or_default();

        let call = BulkPayoutCall {
            recipients,
            amounts,
            url: final_results.url.clone(),
            hash: final_results.hash.clone(),
            tx_id: PAYOUT_TX_ID,
        };
        let receipt = self
            .submit("bulk_payout", self.ctx.gateway().bulk_payout(escrow, &call, self.tx(gas)))
            .await?;

        let transferred = self.ctx.gateway().bulk_paid(escrow, self.call()).await?;
        let status = self.read_status(escrow).await?;

        if transferred {
            self.final_results = Some(final_results.clone());
            info!(
                escrow = %escrow,
                recipients = call.recipients.len(),
                total = total.to_base_units(),
                status_before = %before,
                status_after = %status,
                duration_ms = start.elapsed().as_millis() as u64,
                "💸 Bulk payout transferred"
            );
        } else {
            warn!(
                escrow = %escrow,
                recipients = call.recipients.len(),
                total = total.to_base_units(),
                status = %status,
                "Bulk payout mined but not applied by the escrow"
            );
        }
        self.emit(JobEventKind::PayoutSubmitted { transferred }, Some(status));

        Ok(BulkPayout {
            transferred,
            final_results,
            receipt,
        })
    }

    /// Close a fully paid escrow. Returns whether it reads `Complete`.
    pub async fn complete(&mut self, gas: Option<u64>) -> Result<bool> {
        let escrow = self.bound()?;
        self.require_status(escrow, "complete", |s| s == JobStatus::Paid).await?;

        self.submit("complete", self.ctx.gateway().complete(escrow, self.tx(gas)))
            .await?;

        let status = self.read_status(escrow).await?;
        info!(escrow = %escrow, status = %status, "✅ Job completed");
        self.emit(JobEventKind::Completed, Some(status));

        Ok(status == JobStatus::Complete)
    }

    /// Refund the escrow balance to the gas payer. Returns whether the
    /// escrow reads `Cancelled` and is empty.
    pub async fn cancel(&mut self, gas: Option<u64>) -> Result<bool> {
        let escrow = self.bound()?;
        let before = self
            .require_status(escrow, "cancel", JobStatus::is_refundable)
            .await?;

        self.submit("cancel", self.ctx.gateway().cancel(escrow, self.tx(gas)))
            .await?;

        let status = self.read_status(escrow).await?;
        let balance = self.balance().await?;
        info!(
            escrow = %escrow,
            status_before = %before,
            status_after = %status,
            balance = balance.to_base_units(),
            "🛑 Job cancelled"
        );
        self.emit(JobEventKind::Cancelled, Some(status));

        Ok(status == JobStatus::Cancelled && balance.is_zero())
    }

    /// Refund and destroy the escrow contract. Returns whether the code
    /// at the escrow address is gone.
    pub async fn abort(&mut self, gas: Option<u64>) -> Result<bool> {
        let escrow = self.bound()?;
        let before = self
            .require_status(escrow, "abort", JobStatus::is_refundable)
            .await?;

        self.submit("abort", self.ctx.gateway().abort(escrow, self.tx(gas)))
            .await?;

        let destroyed = self.ctx.gateway().code_at(escrow).await?.is_empty();
        info!(escrow = %escrow, status_before = %before, destroyed, "💥 Job aborted");
        self.emit(JobEventKind::Aborted, None);

        Ok(destroyed)
    }

    pub async fn status(&self) -> Result<JobStatus> {
        let escrow = self.bound()?;
        self.read_status(escrow).await
    }

    pub async fn balance(&self) -> Result<HmtAmount> {
        let escrow = self.bound()?;
        Ok(self.ctx.gateway().balance(escrow, self.call()).await?)
    }

    pub async fn launcher(&self) -> Result<Address> {
        let escrow = self.bound()?;
        Ok(self.ctx.gateway().launcher(escrow, self.call()).await?)
    }

    /// Outcome of the most recent payout submitted to this escrow.
    pub async fn bulk_paid(&self) -> Result<bool> {
        let escrow = self.bound()?;
        Ok(self.ctx.gateway().bulk_paid(escrow, self.call()).await?)
    }

    /// Manifest URL as recorded on chain (set by `setup`).
    pub async fn manifest_url(&self) -> Result<String> {
        let escrow = self.bound()?;
        Ok(self.ctx.gateway().manifest_url(escrow, self.call()).await?)
    }

    /// Manifest hash as recorded on chain (set by `setup`).
    pub async fn manifest_hash(&self) -> Result<String> {
        let escrow = self.bound()?;
        Ok(self.ctx.gateway().manifest_hash(escrow, self.call()).await?)
    }

    /// Download and decrypt the uploaded manifest.
    pub async fn manifest(&self, key: &PrivateKey) -> Result<Manifest> {
        let reference = self
            .manifest_ref
            .as_ref()
            .ok_or_else(|| JobError::State("manifest has not been uploaded".to_string()))?;
        Ok(self
            .ctx
            .payloads()
            .download_verified(&reference.url, &reference.hash, key)
            .await?)
    }

    /// Download the intermediate results the escrow currently points at.
    pub async fn intermediate_results<T: DeserializeOwned>(&self, key: &PrivateKey) -> Result<T> {
        let escrow = self.bound()?;
        let url = self
            .ctx
            .gateway()
            .intermediate_results_url(escrow, self.call())
            .await?;
        self.download_referenced(escrow, "intermediate results", &url, key)
            .await
    }

    /// Download the final results published by the last applied payout.
    pub async fn final_results<T: DeserializeOwned>(&self, key: &PrivateKey) -> Result<T> {
        let escrow = self.bound()?;
        let url = self
            .ctx
            .gateway()
            .final_results_url(escrow, self.call())
            .await?;
        self.download_referenced(escrow, "final results", &url, key)
            .await
    }

    pub fn escrow_address(&self) -> Option<Address> {
        self.escrow
    }

    pub fn factory_address(&self) -> Address {
        self.factory
    }

    pub fn gas_payer(&self) -> Address {
        self.credentials.gas_payer()
    }

    /// Escrow funding in base units.
    pub fn amount(&self) -> HmtAmount {
        self.amount
    }

    pub fn terms(&self) -> &JobTerms {
        &self.terms
    }

    pub fn serialized_manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_ref(&self) -> Option<&PayloadRef> {
        self.manifest_ref.as_ref()
    }

    pub fn intermediate_results_ref(&self) -> Option<&PayloadRef> {
        self.intermediate_results.as_ref()
    }

    pub fn final_results_ref(&self) -> Option<&PayloadRef> {
        self.final_results.as_ref()
    }

    fn bound(&self) -> Result<Address> {
        self.escrow
            .ok_or_else(|| JobError::State("escrow has not been launched".to_string()))
    }

    fn tx(&self, gas: Option<u64>) -> TxOptions<'_> {
        TxOptions::new(&self.credentials, gas.unwrap_or(self.ctx.config().gas_limit))
    }

    fn call(&self) -> CallOptions {
        CallOptions::new(self.credentials.gas_payer(), self.ctx.config().gas_limit)
    }

    async fn read_status(&self, escrow: Address) -> Result<JobStatus> {
        let raw = self
            .ctx
            .gateway()
            .escrow_status_raw(escrow, self.call())
            .await?;
        JobStatus::from_raw(raw).map_err(|e| JobError::Chain(ChainError::Rpc(e.to_string())))
    }

    async fn require_status(
        &self,
        escrow: Address,
        op: &str,
        allowed: impl Fn(JobStatus) -> bool,
    ) -> Result<JobStatus> {
        let status = self.read_status(escrow).await?;
        if allowed(status) {
            Ok(status)
        } else {
            Err(JobError::State(format!(
                "{} not allowed while escrow {} is {}",
                op, escrow, status
            )))
        }
    }

    async fn download_referenced<T: DeserializeOwned>(
        &self,
        escrow: Address,
        what: &str,
        url: &str,
        key: &PrivateKey,
    ) -> Result<T> {
        if url.is_empty() {
            return Err(JobError::State(format!("escrow {} has no {}", escrow, what)));
        }
        Ok(self.ctx.payloads().download(url, key).await?)
    }

    /// Wait for a transaction, bounded by the configured timeout.
    async fn submit<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = hmt_chain::Result<T>>,
    {
        let timeout = self.ctx.config().tx_timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                warn!(op, error = %e, "Transaction failed");
                JobError::from(e)
            }),
            Err(_) => {
                warn!(op, timeout_secs = timeout.as_secs(), "⏳ Timed out waiting for confirmation");
                Err(JobError::Chain(ChainError::Timeout(timeout)))
            }
        }
    }

    fn emit(&self, kind: JobEventKind, status: Option<JobStatus>) {
        let (Some(tx), Some(escrow)) = (&self.events, self.escrow) else {
            return;
        };
        let event = JobEvent {
            escrow,
            kind,
            status,
            timestamp: Utc::now(),
        };
        if tx.send(event).is_err() {
            debug!(escrow = %escrow, "Job event receiver dropped");
        }
    }
}

/// Validate a payout list and convert amounts to base units.
fn to_base_units(payouts: &[(Address, Decimal)]) -> Result<(Vec<Address>, Vec<HmtAmount>)> {
    if payouts.is_empty() {
        return Err(JobError::InvalidPayout("no recipients".to_string()));
    }
    if payouts.len() > BULK_MAX_COUNT {
        return Err(JobError::InvalidPayout(format!(
            "{} recipients, at most {} per payout",
            payouts.len(),
            BULK_MAX_COUNT
        )));
    }

    let mut recipients = Vec::with_capacity(payouts.len());
    let mut amounts = Vec::with_capacity(payouts.len());
    for (recipient, amount) in payouts {
        if recipient.is_zero() {
            return Err(JobError::InvalidPayout("zero address recipient".to_string()));
        }
        if *amount <= Decimal::ZERO {
            return Err(JobError::InvalidPayout(format!(
                "amount {} for {} is not positive",
                amount, recipient
            )));
        }
        let units = HmtAmount::from_decimal(*amount)
            .map_err(|e| JobError::InvalidPayout(e.to_string()))?;
        if units.is_zero() {
            return Err(JobError::InvalidPayout(format!(
                "amount {} for {} is below one base unit",
                amount, recipient
            )));
        }
        recipients.push(*recipient);
        amounts.push(units);
    }

    if HmtAmount::checked_sum(amounts.iter()).is_none() {
        return Err(JobError::InvalidPayout("payout total overflows".to_string()));
    }
    Ok((recipients, amounts))
}
