//! State machine fuzzing for the market
//!
//! Random deposit, withdraw, borrow, repay, liquidate, accrual and price
//! moves are driven straight through `Market::prepare_*` and `Market::apply`.
//! After every step:
//! - the ledger audit passes (totals equal the sum of balances)
//! - a committed withdraw or borrow leaves its account at health >= 1
//! - a committed deposit or repay never lowers health
//! - a committed liquidation hit an account below 1 and paid out no more
//!   than the repaid value plus the seized asset's bonus
//! - a rejected step leaves every balance and total unchanged
//!
//! Increase cases: PROPTEST_CASES=1000 cargo test -p colend-protocol --test fuzzing

use colend_core::{AccountId, Amount, AssetId};
use colend_ledger::AssetTotals;
use colend_oracle::PriceSnapshot;
use colend_protocol::{Market, ProtocolError};
use colend_registry::AssetParams;
use colend_risk::HealthFactor;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

const ACCOUNTS: [&str; 4] = ["ALICE", "BOB", "CAROL", "LP"];
const ASSETS: [&str; 3] = ["X", "Y", "Z"];

fn account(i: usize) -> AccountId {
    AccountId::new(ACCOUNTS[i]).unwrap()
}

fn asset(i: usize) -> AssetId {
    AssetId::new(ASSETS[i]).unwrap()
}

// ============================================================================
// SNAPSHOT FOR "NO MUTATION ON ERROR" CHECKING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    /// (deposit, borrow) per account and asset
    balances: Vec<(Amount, Amount)>,
    totals: Vec<AssetTotals>,
}

impl Snapshot {
    fn take(market: &Market) -> Self {
        let mut balances = Vec::new();
        for a in 0..ACCOUNTS.len() {
            for s in 0..ASSETS.len() {
                balances.push((
                    market.deposit_balance(&account(a), &asset(s)),
                    market.borrow_balance(&account(a), &asset(s)),
                ));
            }
        }
        let totals = (0..ASSETS.len()).map(|s| market.ledger().totals(&asset(s))).collect();
        Self { balances, totals }
    }
}

// ============================================================================
// ACTIONS
// ============================================================================

#[derive(Debug, Clone)]
enum Action {
    Deposit { who: usize, asset: usize, amount: u64 },
    Withdraw { who: usize, asset: usize, amount: u64 },
    Borrow { who: usize, asset: usize, amount: u64 },
    Repay { who: usize, asset: usize, amount: u64 },
    Liquidate { liquidator: usize, who: usize, asset: usize, amount: u64 },
    /// New price in hundredths
    SetPrice { asset: usize, cents: i64 },
    Accrue { asset: usize },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    let who = 0..ACCOUNTS.len();
    let asset = 0..ASSETS.len();
    let amount = 1u64..2_000;

    prop_oneof![
        6 => (who.clone(), asset.clone(), amount.clone())
            .prop_map(|(who, asset, amount)| Action::Deposit { who, asset, amount }),
        3 => (who.clone(), asset.clone(), amount.clone())
            .prop_map(|(who, asset, amount)| Action::Withdraw { who, asset, amount }),
        5 => (who.clone(), asset.clone(), amount.clone())
            .prop_map(|(who, asset, amount)| Action::Borrow { who, asset, amount }),
        3 => (who.clone(), asset.clone(), amount.clone())
            .prop_map(|(who, asset, amount)| Action::Repay { who, asset, amount }),
        3 => (who.clone(), who.clone(), asset.clone(), amount)
            .prop_map(|(liquidator, who, asset, amount)| Action::Liquidate { liquidator, who, asset, amount }),
        3 => (asset.clone(), 10i64..300).prop_map(|(asset, cents)| Action::SetPrice { asset, cents }),
        1 => asset.prop_map(|asset| Action::Accrue { asset }),
    ]
}

// ============================================================================
// HARNESS
// ============================================================================

struct Fuzzer {
    market: Market,
    admin: AccountId,
    prices: BTreeMap<AssetId, Decimal>,
}

impl Fuzzer {
    /// X: 75% / 5%. Y: 50% / 8%, 1% per accrual. Z: not collateral.
    /// LP seeds 10_000 of every asset; all prices start at 1.0.
    fn new() -> Self {
        let admin = AccountId::new("ADMIN").unwrap();
        let mut fuzzer = Self {
            market: Market::new(admin.clone()),
            admin,
            prices: (0..ASSETS.len()).map(|s| (asset(s), Decimal::ONE)).collect(),
        };

        let listings = [
            AssetParams::new(7500, 500).unwrap(),
            AssetParams::new(5000, 800).unwrap().with_borrow_rate(100).unwrap(),
            AssetParams::new(0, 0).unwrap(),
        ];
        for (s, params) in listings.into_iter().enumerate() {
            let t = fuzzer.market.prepare_register(&fuzzer.admin, &asset(s), params).unwrap();
            fuzzer.market.apply(t.change).unwrap();
        }
        for s in 0..ASSETS.len() {
            let prices = fuzzer.snapshot();
            let t = fuzzer
                .market
                .prepare_deposit(&account(3), &asset(s), Amount::from_units(10_000), &prices)
                .unwrap();
            fuzzer.market.apply(t.change).unwrap();
        }
        fuzzer
    }

    fn snapshot(&self) -> PriceSnapshot {
        PriceSnapshot::from_values(self.prices.clone())
    }

    fn health(&self, who: usize) -> HealthFactor {
        self.market.health(&account(who), &self.snapshot()).unwrap()
    }

    /// Run one action, checking every property that applies to it
    fn step(&mut self, action: &Action) {
        let before = Snapshot::take(&self.market);

        let result = match *action {
            Action::Deposit { who, asset: s, amount } => {
                let health_before = self.health(who);
                let result = self.deposit(who, s, amount);
                if result.is_ok() {
                    assert!(self.health(who) >= health_before, "deposit lowered health: {:?}", action);
                }
                result
            }
            Action::Withdraw { who, asset: s, amount } => {
                let result = self.withdraw(who, s, amount);
                if result.is_ok() {
                    assert!(self.health(who) >= HealthFactor::Finite(Decimal::ONE), "{:?}", action);
                }
                result
            }
            Action::Borrow { who, asset: s, amount } => {
                let result = self.borrow(who, s, amount);
                if result.is_ok() {
                    assert!(self.health(who) >= HealthFactor::Finite(Decimal::ONE), "{:?}", action);
                }
                result
            }
            Action::Repay { who, asset: s, amount } => {
                let health_before = self.health(who);
                let result = self.repay(who, s, amount);
                if result.is_ok() {
                    assert!(self.health(who) >= health_before, "repay lowered health: {:?}", action);
                }
                result
            }
            Action::Liquidate {
                liquidator,
                who,
                asset: s,
                amount,
            } => {
                let health_before = self.health(who);
                let result = self.liquidate(liquidator, who, s, amount);
                if result.is_ok() {
                    assert!(health_before < HealthFactor::Finite(Decimal::ONE), "{:?}", action);
                }
                result
            }
            Action::SetPrice { asset: s, cents } => {
                self.prices.insert(asset(s), Decimal::new(cents, 2));
                Ok(())
            }
            Action::Accrue { asset: s } => self.accrue(s),
        };

        if let Err(e) = &result {
            assert_eq!(
                Snapshot::take(&self.market),
                before,
                "{:?} failed with {} but changed the ledger",
                action,
                e
            );
        }
        self.market.audit().unwrap();
    }

    fn deposit(&mut self, who: usize, s: usize, amount: u64) -> Result<(), ProtocolError> {
        let prices = self.snapshot();
        let t = self
            .market
            .prepare_deposit(&account(who), &asset(s), Amount::from_units(amount), &prices)?;
        self.market.apply(t.change)
    }

    fn withdraw(&mut self, who: usize, s: usize, amount: u64) -> Result<(), ProtocolError> {
        let prices = self.snapshot();
        let t = self
            .market
            .prepare_withdraw(&account(who), &asset(s), Amount::from_units(amount), &prices)?;
        self.market.apply(t.change)
    }

    fn borrow(&mut self, who: usize, s: usize, amount: u64) -> Result<(), ProtocolError> {
        let prices = self.snapshot();
        let t = self
            .market
            .prepare_borrow(&account(who), &asset(s), Amount::from_units(amount), &prices)?;
        self.market.apply(t.change)
    }

    fn repay(&mut self, who: usize, s: usize, amount: u64) -> Result<(), ProtocolError> {
        let prices = self.snapshot();
        let t = self
            .market
            .prepare_repay(&account(who), &asset(s), Amount::from_units(amount), &prices)?;
        self.market.apply(t.change)
    }

    fn liquidate(&mut self, liquidator: usize, who: usize, s: usize, amount: u64) -> Result<(), ProtocolError> {
        let prices = self.snapshot();
        let t = self.market.prepare_liquidate(
            &account(liquidator),
            &account(who),
            &asset(s),
            Amount::from_units(amount),
            &prices,
        )?;

        let result = &t.output;
        if let Some(seized) = &result.seized_asset {
            let repaid_value = result.repaid_amount.value() * self.prices[&asset(s)];
            let ceiling = self
                .market
                .registry()
                .get(seized)?
                .liquidation_bonus()
                .apply_bonus(repaid_value)
                .unwrap();
            let seized_value = result.seized_amount.value() * self.prices[seized];
            assert!(
                seized_value <= ceiling,
                "seized {} worth {} over {}",
                result.seized_amount,
                seized_value,
                ceiling
            );
        }
        self.market.apply(t.change)
    }

    fn accrue(&mut self, s: usize) -> Result<(), ProtocolError> {
        let t = self.market.prepare_accrue_interest(&self.admin, &asset(s))?;
        self.market.apply(t.change)
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fuzz_market_state_machine(actions in prop::collection::vec(action_strategy(), 20..80)) {
        let mut fuzzer = Fuzzer::new();
        for action in &actions {
            fuzzer.step(action);
        }
    }

    #[test]
    fn fuzz_borrow_never_breaches_health(
        collateral in 1u64..5_000,
        borrow in 1u64..5_000,
        cents in 10i64..300,
    ) {
        let mut fuzzer = Fuzzer::new();
        fuzzer.step(&Action::SetPrice { asset: 0, cents });
        fuzzer.step(&Action::Deposit { who: 0, asset: 0, amount: collateral });

        let committed = fuzzer.borrow(0, 1, borrow).is_ok();
        // X counts at 75% of its price; Y stays at 1.0
        let limit = Decimal::from(collateral) * Decimal::new(cents, 2) * Decimal::new(75, 2);
        prop_assert_eq!(committed, Decimal::from(borrow) <= limit);
        fuzzer.market.audit().unwrap();
    }
}
