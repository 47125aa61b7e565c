//! Client for HUMAN Protocol escrow jobs.
//!
//! A [`Job`] drives one escrow contract through its lifecycle while the
//! manifest and result payloads travel encrypted through content-addressed
//! storage:
//!
//! ```text
//! let ctx = EscrowContext::connect(EscrowConfig::from_env())?;
//! let credentials = Credentials::new(gas_payer, gas_payer_priv)?;
//!
//! let mut job = Job::new(ctx, credentials, manifest, None).await?;
//! job.launch(&reputation_oracle_pub, None).await?;
//! job.setup(None).await?;
//! let payout = job.bulk_payout(&payouts, &results, &reputation_oracle_pub, None).await?;
//! if payout.transferred && job.status().await? == JobStatus::Paid {
//!     job.complete(None).await?;
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod job;
pub mod logging;
pub mod manifest;

pub use config::{EscrowConfig, LoggingConfig, StorageSettings};
pub use context::EscrowContext;
pub use error::{JobError, Result};
pub use events::{JobEvent, JobEventKind};
pub use job::{BulkPayout, Job};
pub use logging::init_logging;
pub use manifest::{JobTerms, Manifest};

pub use hmt_chain::EvmConfig;
pub use hmt_crypto::{Credentials, PrivateKey, PublicKey};
pub use hmt_types::{Address, HmtAmount, JobStatus};
pub use rust_decimal::Decimal;
