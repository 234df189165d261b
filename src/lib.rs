//! tallyroot: k-of-n multisig approvals whose state lives in authenticated
//! sparse maps.
//!
//! This crate re-exports the workspace crates so that embedders depend on a
//! single package.

pub use tallyroot_crypto as crypto;
pub use tallyroot_errors as errors;
pub use tallyroot_log as log;
pub use tallyroot_multisig as multisig;
pub use tallyroot_store as store;
pub use tallyroot_types as types;

pub use tallyroot_errors::{Error, ErrorKind, Result};
pub use tallyroot_multisig::{
    ApprovalRequest, Ledger, MemLedger, MultisigContract, ProposalBook, Roster,
    SettlementRequest, TransitionOutcome, TransparentBackend,
};
pub use tallyroot_types::MultisigConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Install the JSON tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured `log_level`.
pub fn init_logging(config: &MultisigConfig) -> std::result::Result<(), BoxError> {
    if std::env::var_os("RUST_LOG").is_some() {
        tallyroot_log::init_tracing()
    } else {
        tallyroot_log::init_tracing_with_level(&config.log_level)
    }
}

/// Load the configuration from its default location and start logging
pub fn bootstrap() -> std::result::Result<MultisigConfig, BoxError> {
    let config = MultisigConfig::load_or_default()?;
    init_logging(&config)?;
    tallyroot_log::debug!(
        path = %MultisigConfig::default_config_file().display(),
        fee = config.account_creation_fee,
        "configuration loaded"
    );
    Ok(config)
}
