//! CLI commands

use colend_core::{AccountId, Amount, AssetId};
use colend_events::EventReader;
use colend_oracle::MockOracle;
use colend_registry::AssetParams;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

use crate::protocol::LendingProtocol;

/// A scripted session: the registry admin plus an ordered list of steps
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub admin: AccountId,
    pub steps: Vec<Step>,
}

/// One scripted operation. Amounts and prices are decimal strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Register {
        asset: AssetId,
        collateral_factor_bps: u32,
        liquidation_bonus_bps: u32,
        #[serde(default)]
        borrow_rate_bps: u32,
    },
    SetPrice {
        asset: AssetId,
        price: Decimal,
    },
    Deposit {
        account: AccountId,
        asset: AssetId,
        amount: Amount,
    },
    Withdraw {
        account: AccountId,
        asset: AssetId,
        amount: Amount,
    },
    Borrow {
        account: AccountId,
        asset: AssetId,
        amount: Amount,
    },
    Repay {
        account: AccountId,
        asset: AssetId,
        amount: Amount,
    },
    Liquidate {
        liquidator: AccountId,
        account: AccountId,
        asset: AssetId,
        amount: Amount,
    },
    Accrue {
        asset: AssetId,
    },
    Deactivate {
        asset: AssetId,
    },
    Health {
        account: AccountId,
    },
}

impl Script {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Outcome counts of a script run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Execute `steps` in order against `protocol`.
///
/// A failing step is printed with its error kind. With `keep_going` the
/// run continues; otherwise the first failure ends it with an error.
pub async fn run_script(
    protocol: &mut LendingProtocol,
    oracle: &MockOracle,
    script: &Script,
    keep_going: bool,
) -> Result<RunSummary, anyhow::Error> {
    let mut summary = RunSummary::default();

    for (index, step) in script.steps.iter().enumerate() {
        match execute(protocol, oracle, &script.admin, step).await {
            Ok(message) => {
                summary.succeeded += 1;
                println!("✅ [{}] {}", index + 1, message);
            }
            Err(e) => {
                summary.failed += 1;
                println!("❌ [{}] {}", index + 1, e);
                if !keep_going {
                    anyhow::bail!("step {} failed: {}", index + 1, e);
                }
            }
        }
    }

    protocol.audit()?;
    println!(
        "Ledger audit passed ({} ok, {} failed, last event seq {})",
        summary.succeeded,
        summary.failed,
        protocol.last_sequence()
    );
    Ok(summary)
}

async fn execute(
    protocol: &mut LendingProtocol,
    oracle: &MockOracle,
    admin: &AccountId,
    step: &Step,
) -> Result<String, StepError> {
    let message = match step {
        Step::Register {
            asset,
            collateral_factor_bps,
            liquidation_bonus_bps,
            borrow_rate_bps,
        } => {
            let params = AssetParams::new(*collateral_factor_bps, *liquidation_bonus_bps)
                .and_then(|p| p.with_borrow_rate(*borrow_rate_bps))
                .map_err(crate::ProtocolError::from)?;
            protocol.register_with_params(admin, asset, params)?;
            format!(
                "Registered {} (cf {} bps, bonus {} bps, rate {} bps)",
                asset, collateral_factor_bps, liquidation_bonus_bps, borrow_rate_bps
            )
        }
        Step::SetPrice { asset, price } => {
            oracle.set_price(asset.clone(), *price);
            format!("Price of {} set to {}", asset, price)
        }
        Step::Deposit { account, asset, amount } => {
            protocol.deposit(account, asset, *amount).await?;
            format!("{} deposited {} {}", account, amount, asset)
        }
        Step::Withdraw { account, asset, amount } => {
            protocol.withdraw(account, asset, *amount).await?;
            format!("{} withdrew {} {}", account, amount, asset)
        }
        Step::Borrow { account, asset, amount } => {
            protocol.borrow(account, asset, *amount).await?;
            format!("{} borrowed {} {}", account, amount, asset)
        }
        Step::Repay { account, asset, amount } => {
            protocol.repay(account, asset, *amount).await?;
            format!("{} repaid {} {}", account, amount, asset)
        }
        Step::Liquidate {
            liquidator,
            account,
            asset,
            amount,
        } => {
            let result = protocol.liquidate(liquidator, account, asset, *amount).await?;
            let seized = match &result.seized_asset {
                Some(seized) => format!("{} {}", result.seized_amount, seized),
                None => "nothing".to_string(),
            };
            format!(
                "{} repaid {} {} for {}, seized {}{} (health now {})",
                liquidator,
                amount,
                asset,
                account,
                seized,
                if result.bonus_shortfall { " [bonus shortfall]" } else { "" },
                result.health_after
            )
        }
        Step::Accrue { asset } => {
            let total = protocol.accrue_interest(admin, asset)?;
            format!("Accrued {} {} of interest", total, asset)
        }
        Step::Deactivate { asset } => {
            protocol.deactivate(admin, asset)?;
            format!("Deactivated {}", asset)
        }
        Step::Health { account } => {
            let health = protocol.get_health(account).await?;
            format!("Health of {}: {}", account, health)
        }
    };
    Ok(message)
}

/// Error of a single step, printed with its kind
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {source}")]
struct StepError {
    kind: crate::ErrorKind,
    source: crate::ProtocolError,
}

impl From<crate::ProtocolError> for StepError {
    fn from(source: crate::ProtocolError) -> Self {
        Self {
            kind: source.kind(),
            source,
        }
    }
}

/// Print a JSONL event log
pub fn events(dir: impl AsRef<Path>, verify: bool) -> Result<(), anyhow::Error> {
    let reader = EventReader::from_directory(dir)?;
    let events = if verify {
        reader.read_verified()?
    } else {
        reader.read_all()?
    };

    for event in &events {
        let legs: Vec<String> = event
            .assets
            .iter()
            .zip(&event.amounts)
            .map(|(asset, amount)| format!("{} {}", amount, asset))
            .collect();
        println!(
            "#{:<4} {} {:<18} account={} legs=[{}] health={}",
            event.sequence,
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.kind,
            event.account.as_ref().map(|a| a.as_str()).unwrap_or("-"),
            legs.join(", "),
            event
                .health
                .map(|h| h.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    if verify {
        println!("✅ Hash chain verified ({} events in {} files)", events.len(), reader.file_count());
    } else {
        println!("{} events in {} files", events.len(), reader.file_count());
    }
    Ok(())
}
