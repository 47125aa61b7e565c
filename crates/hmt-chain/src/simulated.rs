use crate::error::{ChainError, Result};
use crate::gateway::ContractGateway;
use crate::types::{BulkPayoutCall, CallOptions, EscrowSetup, TxOptions, TxReceipt, BULK_MAX_COUNT};
use async_trait::async_trait;
use hmt_types::{Address, HmtAmount};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

// Escrow.sol status enum, zero-based.
const RAW_LAUNCHED: u8 = 0;
const RAW_PENDING: u8 = 1;
const RAW_PARTIAL: u8 = 2;
const RAW_PAID: u8 = 3;
const RAW_COMPLETE: u8 = 4;
const RAW_CANCELLED: u8 = 5;

// Stand-in bytecode, only ever compared for emptiness.
const FACTORY_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52, 0xfa];
const ESCROW_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52, 0xec];

/// Gas charged per call. A call whose limit is below the charge fails
/// with [`ChainError::OutOfGas`] and changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSchedule {
    pub view: u64,
    pub deploy_factory: u64,
    pub create_escrow: u64,
    pub transfer: u64,
    pub setup: u64,
    pub store_results: u64,
    pub bulk_payout_base: u64,
    pub bulk_payout_per_recipient: u64,
    pub complete: u64,
    pub cancel: u64,
    pub abort: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            view: 25_000,
            deploy_factory: 1_200_000,
            create_escrow: 1_800_000,
            transfer: 60_000,
            setup: 200_000,
            store_results: 120_000,
            bulk_payout_base: 80_000,
            bulk_payout_per_recipient: 40_000,
            complete: 40_000,
            cancel: 70_000,
            abort: 80_000,
        }
    }
}

impl GasSchedule {
    pub fn bulk_payout(&self, recipients: usize) -> u64 {
        self.bulk_payout_base + self.bulk_payout_per_recipient * recipients as u64
    }
}

#[derive(Debug, Default)]
struct Factory {
    escrows: Vec<Address>,
}

#[derive(Debug)]
struct Escrow {
    launcher: Address,
    canceler: Address,
    status: u8,
    reputation_oracle: Address,
    recording_oracle: Address,
    reputation_oracle_stake: u8,
    recording_oracle_stake: u8,
    manifest_url: String,
    manifest_hash: String,
    intermediate_results_url: String,
    intermediate_results_hash: String,
    final_results_url: String,
    final_results_hash: String,
    bulk_paid: bool,
}

impl Escrow {
    fn new(launcher: Address) -> Self {
        Self {
            launcher,
            canceler: launcher,
            status: RAW_LAUNCHED,
            reputation_oracle: Address::ZERO,
            recording_oracle: Address::ZERO,
            reputation_oracle_stake: 0,
            recording_oracle_stake: 0,
            manifest_url: String::new(),
            manifest_hash: String::new(),
            intermediate_results_url: String::new(),
            intermediate_results_hash: String::new(),
            final_results_url: String::new(),
            final_results_hash: String::new(),
            bulk_paid: false,
        }
    }

    fn require_status(&self, allowed: &[u8], message: &str) -> Result<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(ChainError::Reverted(message.to_string()))
        }
    }
}

#[derive(Debug, Default)]
struct ChainState {
    block_number: u64,
    nonce: u64,
    balances: HashMap<Address, u128>,
    code: HashMap<Address, Vec<u8>>,
    factories: HashMap<Address, Factory>,
    escrows: HashMap<Address, Escrow>,
}

impl ChainState {
    fn balance_of(&self, who: &Address) -> u128 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    fn move_tokens(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(ChainError::Reverted(
                "transfer amount exceeds balance".to_string(),
            ));
        }
        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    fn next_address(&mut self, deployer: Address) -> Address {
        self.nonce += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(deployer.as_bytes());
        hasher.update(&self.nonce.to_be_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[..20]);
        Address::from_bytes(bytes)
    }

    fn mine(&mut self, from: Address, gas_used: u64, contract_address: Option<Address>) -> TxReceipt {
        self.nonce += 1;
        self.block_number += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(from.as_bytes());
        hasher.update(&self.nonce.to_be_bytes());
        hasher.update(&self.block_number.to_be_bytes());

        TxReceipt {
            tx_hash: format!("0x{}", hasher.finalize().to_hex()),
            block_number: self.block_number,
            gas_used,
            contract_address,
        }
    }

    fn has_code(&self, address: &Address) -> bool {
        self.code.get(address).map_or(false, |c| !c.is_empty())
    }

    fn factory(&self, address: Address) -> Result<&Factory> {
        if !self.has_code(&address) {
            return Err(ChainError::NoContract(address));
        }
        self.factories
            .get(&address)
            .ok_or(ChainError::NoContract(address))
    }

    fn escrow(&self, address: Address) -> Result<&Escrow> {
        if !self.has_code(&address) {
            return Err(ChainError::NoContract(address));
        }
        self.escrows
            .get(&address)
            .ok_or(ChainError::NoContract(address))
    }

    fn escrow_mut(&mut self, address: Address) -> Result<&mut Escrow> {
        if !self.has_code(&address) {
            return Err(ChainError::NoContract(address));
        }
        self.escrows
            .get_mut(&address)
            .ok_or(ChainError::NoContract(address))
    }

    /// Send the whole escrow balance back to its canceler.
    fn refund(&mut self, escrow: Address) -> Result<u128> {
        let canceler = self.escrow(escrow)?.canceler;
        let balance = self.balance_of(&escrow);
        if balance > 0 {
            self.move_tokens(escrow, canceler, balance)?;
        }
        Ok(balance)
    }
}

/// In-memory chain with the factory, escrow and HMT token contracts.
///
/// A transaction is applied as soon as it is submitted. The optional
/// confirmation delay only postpones the point at which the call
/// returns, like a node that is slow to report a mined block.
pub struct SimulatedChain {
    state: Arc<RwLock<ChainState>>,
    gas: GasSchedule,
    confirmation_delay: Duration,
}

impl SimulatedChain {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ChainState::default())),
            gas: GasSchedule::default(),
            confirmation_delay: Duration::ZERO,
        }
    }

    pub fn with_gas_schedule(mut self, gas: GasSchedule) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn gas_schedule(&self) -> &GasSchedule {
        &self.gas
    }

    /// Credit HMT out of thin air. Genesis allocation for tests.
    pub async fn mint(&self, to: Address, amount: HmtAmount) {
        let mut state = self.state.write().await;
        *state.balances.entry(to).or_insert(0) += amount.to_base_units();
        debug!(to = %to, amount = amount.to_base_units(), "Minted HMT");
    }

    pub async fn token_balance(&self, who: Address) -> HmtAmount {
        HmtAmount::from_base_units(self.state.read().await.balance_of(&who))
    }

    pub async fn block_number(&self) -> u64 {
        self.state.read().await.block_number
    }

    fn charge(&self, limit: u64, required: u64) -> Result<()> {
        if limit < required {
            return Err(ChainError::OutOfGas { limit, required });
        }
        Ok(())
    }

    async fn confirm(&self, receipt: TxReceipt) -> Result<TxReceipt> {
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }
        Ok(receipt)
    }

    async fn view<T, F>(&self, escrow: Address, call: CallOptions, read: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&Escrow) -> T + Send,
    {
        self.charge(call.gas, self.gas.view)?;
        let state = self.state.read().await;
        Ok(read(state.escrow(escrow)?))
    }
}

impl Default for SimulatedChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractGateway for SimulatedChain {
    async fn deploy_factory(&self, tx: TxOptions<'_>) -> Result<Address> {
        self.charge(tx.gas, self.gas.deploy_factory)?;
        let receipt = {
            let mut state = self.state.write().await;
            let address = state.next_address(tx.from());
            state.code.insert(address, FACTORY_CODE.to_vec());
            state.factories.insert(address, Factory::default());
            state.mine(tx.from(), self.gas.deploy_factory, Some(address))
        };

        info!(factory = %receipt.contract_address.unwrap_or_default(), block = receipt.block_number, "🏭 Factory deployed");
        let receipt = self.confirm(receipt).await?;
        Ok(receipt.contract_address.unwrap_or_default())
    }

    async fn create_escrow(&self, factory: Address, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.charge(tx.gas, self.gas.create_escrow)?;
        let receipt = {
            let mut state = self.state.write().await;
            state.factory(factory)?;
            let escrow = state.next_address(factory);
            state.code.insert(escrow, ESCROW_CODE.to_vec());
            state.escrows.insert(escrow, Escrow::new(tx.from()));
            if let Some(f) = state.factories.get_mut(&factory) {
                f.escrows.push(escrow);
            }
            state.mine(tx.from(), self.gas.create_escrow, Some(escrow))
        };

        debug!(factory = %factory, escrow = %receipt.contract_address.unwrap_or_default(), "Escrow created");
        self.confirm(receipt).await
    }

    async fn last_escrow(&self, factory: Address, call: CallOptions) -> Result<Address> {
        self.charge(call.gas, self.gas.view)?;
        let state = self.state.read().await;
        Ok(state
            .factory(factory)?
            .escrows
            .last()
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn has_escrow(&self, factory: Address, escrow: Address, call: CallOptions) -> Result<bool> {
        self.charge(call.gas, self.gas.view)?;
        let state = self.state.read().await;
        Ok(state.factory(factory)?.escrows.contains(&escrow))
    }

    async fn transfer_hmt(&self, to: Address, amount: HmtAmount, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.charge(tx.gas, self.gas.transfer)?;
        let receipt = {
            let mut state = self.state.write().await;
            state.move_tokens(tx.from(), to, amount.to_base_units())?;
            state.mine(tx.from(), self.gas.transfer, None)
        };
        self.confirm(receipt).await
    }

    async fn escrow_status_raw(&self, escrow: Address, call: CallOptions) -> Result<u8> {
        self.view(escrow, call, |e| e.status).await
    }

    async fn manifest_url(&self, escrow: Address, call: CallOptions) -> Result<String> {
        self.view(escrow, call, |e| e.manifest_url.clone()).await
    }

    async fn manifest_hash(&self, escrow: Address, call: CallOptions) -> Result<String> {
        self.view(escrow, call, |e| e.manifest_hash.clone()).await
    }

    async fn intermediate_results_url(&self, escrow: Address, call: CallOptions) -> Result<String> {
        self.view(escrow, call, |e| e.intermediate_results_url.clone()).await
    }

    async fn intermediate_results_hash(&self, escrow: Address, call: CallOptions) -> Result<String> {
        self.view(escrow, call, |e| e.intermediate_results_hash.clone()).await
    }

    async fn final_results_url(&self, escrow: Address, call: CallOptions) -> Result<String> {
        self.view(escrow, call, |e| e.final_results_url.clone()).await
    }

    async fn balance(&self, escrow: Address, call: CallOptions) -> Result<HmtAmount> {
        self.charge(call.gas, self.gas.view)?;
        let state = self.state.read().await;
        state.escrow(escrow)?;
        Ok(HmtAmount::from_base_units(state.balance_of(&escrow)))
    }

    async fn launcher(&self, escrow: Address, call: CallOptions) -> Result<Address> {
        self.view(escrow, call, |e| e.launcher).await
    }

    async fn bulk_paid(&self, escrow: Address, call: CallOptions) -> Result<bool> {
        self.view(escrow, call, |e| e.bulk_paid).await
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>> {
        let state = self.state.read().await;
        Ok(state.code.get(&address).cloned().unwrap_or_default())
    }

    async fn setup(&self, escrow: Address, args: &EscrowSetup, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.charge(tx.gas, self.gas.setup)?;
        let receipt = {
            let mut state = self.state.write().await;
            let e = state.escrow_mut(escrow)?;
            e.require_status(&[RAW_LAUNCHED], "Escrow not in Launched status state")?;
            if args.reputation_oracle.is_zero() || args.recording_oracle.is_zero() {
                return Err(ChainError::Reverted("Invalid oracle address".to_string()));
            }
            let total_stake =
                u16::from(args.reputation_oracle_stake) + u16::from(args.recording_oracle_stake);
            if total_stake > 100 {
                return Err(ChainError::Reverted("Stake out of bounds".to_string()));
            }

            e.reputation_oracle = args.reputation_oracle;
            e.recording_oracle = args.recording_oracle;
            e.reputation_oracle_stake = args.reputation_oracle_stake;
            e.recording_oracle_stake = args.recording_oracle_stake;
            e.manifest_url = args.manifest_url.clone();
            e.manifest_hash = args.manifest_hash.clone();
            e.status = RAW_PENDING;
            state.mine(tx.from(), self.gas.setup, None)
        };
        self.confirm(receipt).await
    }

    async fn store_results(&self, escrow: Address, url: &str, hash: &str, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.charge(tx.gas, self.gas.store_results)?;
        let receipt = {
            let mut state = self.state.write().await;
            let e = state.escrow_mut(escrow)?;
            e.require_status(
                &[RAW_PENDING, RAW_PARTIAL],
                "Escrow not in Pending or Partial status state",
            )?;
            e.intermediate_results_url = url.to_string();
            e.intermediate_results_hash = hash.to_string();
            state.mine(tx.from(), self.gas.store_results, None)
        };
        self.confirm(receipt).await
    }

    async fn bulk_payout(&self, escrow: Address, args: &BulkPayoutCall, tx: TxOptions<'_>) -> Result<TxReceipt> {
        let gas_needed = self.gas.bulk_payout(args.recipients.len());
        self.charge(tx.gas, gas_needed)?;

        let receipt = {
            let mut state = self.state.write().await;
            let balance = state.balance_of(&escrow);
            let e = state.escrow_mut(escrow)?;
            e.require_status(
                &[RAW_PENDING, RAW_PARTIAL],
                "Escrow not in Pending or Partial status state",
            )?;
            if args.recipients.len() != args.amounts.len() {
                return Err(ChainError::Reverted(
                    "Amount of recipients and values don't match".to_string(),
                ));
            }
            if args.recipients.len() > BULK_MAX_COUNT {
                return Err(ChainError::Reverted("Too many recipients".to_string()));
            }

            let total = HmtAmount::checked_sum(args.amounts.iter())
                .ok_or_else(|| ChainError::Reverted("Payout sum overflows".to_string()))?;
            e.bulk_paid = false;

            if total.to_base_units() > balance {
                warn!(
                    escrow = %escrow,
                    requested = total.to_base_units(),
                    balance,
                    "Bulk payout exceeds escrow balance, not applied"
                );
                state.mine(tx.from(), gas_needed, None)
            } else {
                let rep = (e.reputation_oracle, e.reputation_oracle_stake);
                let rec = (e.recording_oracle, e.recording_oracle_stake);
                e.final_results_url = args.url.clone();
                e.final_results_hash = args.hash.clone();

                for (recipient, amount) in args.recipients.iter().zip(args.amounts.iter()) {
                    let rep_fee = amount.percent(rep.1).to_base_units();
                    let rec_fee = amount.percent(rec.1).to_base_units();
                    let net = amount.to_base_units() - rep_fee - rec_fee;
                    state.move_tokens(escrow, *recipient, net)?;
                    state.move_tokens(escrow, rep.0, rep_fee)?;
                    state.move_tokens(escrow, rec.0, rec_fee)?;
                }

                let remaining = state.balance_of(&escrow);
                let e = state.escrow_mut(escrow)?;
                e.status = if remaining == 0 { RAW_PAID } else { RAW_PARTIAL };
                e.bulk_paid = true;

                info!(
                    escrow = %escrow,
                    recipients = args.recipients.len(),
                    total = total.to_base_units(),
                    remaining,
                    tx_id = args.tx_id,
                    "💸 Bulk payout applied"
                );
                state.mine(tx.from(), gas_needed, None)
            }
        };
        self.confirm(receipt).await
    }

    async fn complete(&self, escrow: Address, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.charge(tx.gas, self.gas.complete)?;
        let receipt = {
            let mut state = self.state.write().await;
            let e = state.escrow_mut(escrow)?;
            e.require_status(&[RAW_PAID], "Escrow not in Paid state")?;
            e.status = RAW_COMPLETE;
            state.mine(tx.from(), self.gas.complete, None)
        };
        self.confirm(receipt).await
    }

    async fn cancel(&self, escrow: Address, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.charge(tx.gas, self.gas.cancel)?;
        let receipt = {
            let mut state = self.state.write().await;
            state.escrow(escrow)?.require_status(
                &[RAW_LAUNCHED, RAW_PENDING],
                "Escrow in Partial, Paid, Complete or Cancelled state",
            )?;
            let refunded = state.refund(escrow)?;
            state.escrow_mut(escrow)?.status = RAW_CANCELLED;
            debug!(escrow = %escrow, refunded, "Escrow cancelled");
            state.mine(tx.from(), self.gas.cancel, None)
        };
        self.confirm(receipt).await
    }

    async fn abort(&self, escrow: Address, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.charge(tx.gas, self.gas.abort)?;
        let receipt = {
            let mut state = self.state.write().await;
            state.escrow(escrow)?.require_status(
                &[RAW_LAUNCHED, RAW_PENDING],
                "Escrow in Partial, Paid, Complete or Cancelled state",
            )?;
            let refunded = state.refund(escrow)?;
            state.escrow_mut(escrow)?.status = RAW_CANCELLED;
            // selfdestruct
            state.code.remove(&escrow);
            debug!(escrow = %escrow, refunded, "Escrow destroyed");
            state.mine(tx.from(), self.gas.abort, None)
        };
        self.confirm(receipt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmt_crypto::Credentials;

    const GAS: u64 = 4_712_388;

    fn launcher() -> Credentials {
        Credentials::new(
            "0x1413862C2B7054CDbfdc181B83962CB0FC11fD92",
            "28e516f1e2f99e96a48a23cea1f94ee5f073403a1c68e818263f0eb898f1c8e5",
        )
        .unwrap()
    }

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    async fn funded_escrow(chain: &SimulatedChain, creds: &Credentials, stake: u8) -> Address {
        let tx = TxOptions::new(creds, GAS);
        chain.mint(creds.gas_payer(), HmtAmount::from_hmt(1_000)).await;
        let factory = chain.deploy_factory(tx).await.unwrap();
        let receipt = chain.create_escrow(factory, tx).await.unwrap();
        let escrow = receipt.contract_address.unwrap();
        assert_eq!(chain.last_escrow(factory, tx.call()).await.unwrap(), escrow);

        chain
            .transfer_hmt(escrow, HmtAmount::from_hmt(100), tx)
            .await
            .unwrap();
        let setup = EscrowSetup {
            reputation_oracle: addr("0x61F9F0B31eacB420553da8BCC59DC617279731Ac"),
            recording_oracle: addr("0xD979105297fB0eee83F7433fC09279cb5B94fFC6"),
            reputation_oracle_stake: stake,
            recording_oracle_stake: stake,
            manifest_url: "url".to_string(),
            manifest_hash: "hash".to_string(),
        };
        chain.setup(escrow, &setup, tx).await.unwrap();
        escrow
    }

    fn payout(to: &str, hmt: u64) -> BulkPayoutCall {
        BulkPayoutCall {
            recipients: vec![addr(to)],
            amounts: vec![HmtAmount::from_hmt(hmt)],
            url: "final".to_string(),
            hash: "final-hash".to_string(),
            tx_id: 1,
        }
    }

    #[tokio::test]
    async fn test_payout_splits_oracle_fees() {
        let chain = SimulatedChain::new();
        let creds = launcher();
        let escrow = funded_escrow(&chain, &creds, 5).await;
        let tx = TxOptions::new(&creds, GAS);

        let worker = "0x6b7E3C31F34cF38d1DFC1D9A8A59482028395809";
        chain.bulk_payout(escrow, &payout(worker, 20), tx).await.unwrap();

        assert_eq!(
            chain.token_balance(addr(worker)).await,
            HmtAmount::from_hmt(18)
        );
        assert_eq!(
            chain
                .token_balance(addr("0x61F9F0B31eacB420553da8BCC59DC617279731Ac"))
                .await,
            HmtAmount::from_hmt(1)
        );
        assert_eq!(chain.escrow_status_raw(escrow, tx.call()).await.unwrap(), RAW_PARTIAL);
        assert!(chain.bulk_paid(escrow, tx.call()).await.unwrap());
        assert_eq!(chain.final_results_url(escrow, tx.call()).await.unwrap(), "final");
    }

    #[tokio::test]
    async fn test_over_balance_payout_is_silently_rejected() {
        let chain = SimulatedChain::new();
        let creds = launcher();
        let escrow = funded_escrow(&chain, &creds, 0).await;
        let tx = TxOptions::new(&creds, GAS);

        let worker = "0x9d689b8f50Fd2CAec716Cc5220bEd66E03F07B5f";
        let receipt = chain.bulk_payout(escrow, &payout(worker, 101), tx).await;
        assert!(receipt.is_ok());
        assert!(!chain.bulk_paid(escrow, tx.call()).await.unwrap());
        assert_eq!(
            chain.balance(escrow, tx.call()).await.unwrap(),
            HmtAmount::from_hmt(100)
        );
        assert_eq!(chain.escrow_status_raw(escrow, tx.call()).await.unwrap(), RAW_PENDING);
    }

    #[tokio::test]
    async fn test_abort_destroys_code_and_refunds() {
        let chain = SimulatedChain::new();
        let creds = launcher();
        let escrow = funded_escrow(&chain, &creds, 0).await;
        let tx = TxOptions::new(&creds, GAS);

        assert!(!chain.code_at(escrow).await.unwrap().is_empty());
        chain.abort(escrow, tx).await.unwrap();
        assert!(chain.code_at(escrow).await.unwrap().is_empty());
        assert_eq!(
            chain.token_balance(creds.gas_payer()).await,
            HmtAmount::from_hmt(1_000)
        );
        assert_eq!(
            chain.escrow_status_raw(escrow, tx.call()).await,
            Err(ChainError::NoContract(escrow))
        );
    }

    #[tokio::test]
    async fn test_cancel_rejected_after_partial_payout() {
        let chain = SimulatedChain::new();
        let creds = launcher();
        let escrow = funded_escrow(&chain, &creds, 0).await;
        let tx = TxOptions::new(&creds, GAS);

        chain
            .bulk_payout(escrow, &payout("0x6b7E3C31F34cF38d1DFC1D9A8A59482028395809", 10), tx)
            .await
            .unwrap();
        assert!(matches!(
            chain.cancel(escrow, tx).await,
            Err(ChainError::Reverted(_))
        ));
    }

    #[tokio::test]
    async fn test_out_of_gas_changes_nothing() {
        let chain = SimulatedChain::new();
        let creds = launcher();
        let tx = TxOptions::new(&creds, 1_000);
        assert_eq!(
            chain.deploy_factory(tx).await,
            Err(ChainError::OutOfGas {
                limit: 1_000,
                required: GasSchedule::default().deploy_factory
            })
        );
        assert_eq!(chain.block_number().await, 0);
    }

    #[tokio::test]
    async fn test_views_on_unknown_address() {
        let chain = SimulatedChain::new();
        let creds = launcher();
        let call = TxOptions::new(&creds, GAS).call();
        let nowhere = addr("0x852023fbb19050B8291a335E5A83Ac9701E7B4E6");
        assert!(matches!(
            chain.last_escrow(nowhere, call).await,
            Err(ChainError::NoContract(_))
        ));
        assert!(chain.code_at(nowhere).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_requires_balance() {
        let chain = SimulatedChain::new();
        let creds = launcher();
        let tx = TxOptions::new(&creds, GAS);
        let to = addr("0x852023fbb19050B8291a335E5A83Ac9701E7B4E6");
        assert!(matches!(
            chain.transfer_hmt(to, HmtAmount::from_hmt(1), tx).await,
            Err(ChainError::Reverted(_))
        ));
    }
}
