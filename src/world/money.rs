//! Token-bag currency.
//!
//! A [`Money`] value is a concrete collection of discrete tokens rather than a
//! number: whole-unit "dollar" tokens and fractional "coin" tokens, 100 coins
//! to the dollar. Transfers move token objects between bags, so the total
//! number of tokens in the world only changes when money is minted.

use std::fmt;
use uuid::Uuid;

/// Coins per whole unit.
pub const COINS_PER_DOLLAR: u64 = 100;

/// One whole currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dollar {
    pub serial: Uuid,
}

impl Dollar {
    pub fn mint() -> Self {
        Self {
            serial: Uuid::new_v4(),
        }
    }
}

/// One hundredth of a whole currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coin {
    pub serial: Uuid,
}

impl Coin {
    pub fn mint() -> Self {
        Self {
            serial: Uuid::new_v4(),
        }
    }
}

/// An ordered bag of dollar and coin tokens. Order carries no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Money {
    dollars: Vec<Dollar>,
    coins: Vec<Coin>,
}

impl Money {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a bag holding `count` fresh dollar tokens.
    pub fn with_dollars(count: u32) -> Self {
        Self {
            dollars: (0..count).map(|_| Dollar::mint()).collect(),
            coins: Vec::new(),
        }
    }

    /// Mint a bag holding `count` loose coins and no bills.
    pub fn with_coins(count: u32) -> Self {
        Self {
            dollars: Vec::new(),
            coins: (0..count).map(|_| Coin::mint()).collect(),
        }
    }

    /// Mint a bag worth `cents`, using as many dollar tokens as possible.
    pub fn from_cents(cents: u64) -> Self {
        let whole = cents / COINS_PER_DOLLAR;
        let frac = cents % COINS_PER_DOLLAR;
        Self {
            dollars: (0..whole).map(|_| Dollar::mint()).collect(),
            coins: (0..frac).map(|_| Coin::mint()).collect(),
        }
    }

    pub fn dollars(&self) -> &[Dollar] {
        &self.dollars
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn dollar_count(&self) -> u32 {
        self.dollars.len() as u32
    }

    pub fn coin_count(&self) -> u32 {
        self.coins.len() as u32
    }

    /// Exact value in coins: `dollars * 100 + coins`.
    pub fn total_cents(&self) -> u64 {
        self.dollars.len() as u64 * COINS_PER_DOLLAR + self.coins.len() as u64
    }

    /// Value in whole units: `count(dollars) + count(coins) / 100`.
    pub fn sum(&self) -> f64 {
        self.dollars.len() as f64 + self.coins.len() as f64 / COINS_PER_DOLLAR as f64
    }

    pub fn is_empty(&self) -> bool {
        self.dollars.is_empty() && self.coins.is_empty()
    }

    /// Concatenate another bag's tokens onto this one.
    pub fn merge(&mut self, other: Money) {
        self.dollars.extend(other.dollars);
        self.coins.extend(other.coins);
    }

    /// Detach `count` dollar tokens from the front of the bag.
    /// Returns `None` and leaves the bag untouched when there are not enough.
    pub fn take_dollars(&mut self, count: u32) -> Option<Money> {
        let count = count as usize;
        if count > self.dollars.len() {
            return None;
        }
        Some(Money {
            dollars: self.dollars.drain(..count).collect(),
            coins: Vec::new(),
        })
    }

    /// Longer form used by the MONEY command.
    pub fn describe(&self) -> String {
        format!(
            "{} ({} {}, {} {})",
            self,
            self.dollars.len(),
            if self.dollars.len() == 1 { "bill" } else { "bills" },
            self.coins.len(),
            if self.coins.len() == 1 { "coin" } else { "coins" },
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_cents(self.total_cents()))
    }
}

/// Format a coin count as `$D.CC`.
pub fn format_cents(cents: u64) -> String {
    format!(
        "${}.{:02}",
        cents / COINS_PER_DOLLAR,
        cents % COINS_PER_DOLLAR
    )
}
