//! Portfolio accounting: apply_buy, apply_sell.
//! Pure functions over a `User` snapshot; testable without HTTP or a store.

use rust_decimal::Decimal;

use crate::error::ExchangeError;
use crate::types::{Position, User};

/// Result of a buy applied to a user snapshot.
#[derive(Debug)]
pub struct BuyOutcome {
    pub user: User,
    pub fee: Decimal,
    pub total_cost: Decimal,
}

/// Result of a sell applied to a user snapshot.
#[derive(Debug)]
pub struct SellOutcome {
    pub user: User,
    pub fee: Decimal,
    pub total_value: Decimal,
}

/// Apply a buy: debit cost plus fee, add to the position with a
/// volume-weighted average price, or open a new position at the trade price.
/// The input user is untouched on any error.
pub fn apply_buy(
    user: &User,
    symbol: &str,
    name: &str,
    amount: Decimal,
    price: Decimal,
    fee_rate: Decimal,
) -> Result<BuyOutcome, ExchangeError> {
    check_positive(amount, price)?;

    let total_cost = amount * price;
    let fee = total_cost * fee_rate;
    let total_with_fee = total_cost + fee;

    if user.balance < total_with_fee {
        return Err(ExchangeError::InsufficientFunds {
            needed: total_with_fee,
            available: user.balance,
        });
    }

    let mut updated = user.clone();
    updated.balance -= total_with_fee;

    match updated.portfolio.iter_mut().find(|p| p.symbol == symbol) {
        Some(position) => {
            let new_amount = position.amount + amount;
            // Weighted average over the old cost basis and the new lot.
            position.average_price =
                (position.amount * position.average_price + amount * price) / new_amount;
            position.amount = new_amount;
        }
        None => updated.portfolio.push(Position {
            symbol: symbol.to_string(),
            name: name.to_string(),
            amount,
            average_price: price,
        }),
    }

    Ok(BuyOutcome {
        user: updated,
        fee,
        total_cost,
    })
}

/// Apply a sell: credit proceeds minus fee and reduce the position. A
/// position that reaches exactly zero is removed; the average price of any
/// remainder is unchanged. The input user is untouched on any error.
pub fn apply_sell(
    user: &User,
    symbol: &str,
    amount: Decimal,
    price: Decimal,
    fee_rate: Decimal,
) -> Result<SellOutcome, ExchangeError> {
    check_positive(amount, price)?;

    let index = user
        .portfolio
        .iter()
        .position(|p| p.symbol == symbol)
        .ok_or_else(|| ExchangeError::NoSuchPosition(symbol.to_string()))?;
    let held = user.portfolio[index].amount;
    if held < amount {
        return Err(ExchangeError::InsufficientHoldings {
            symbol: symbol.to_string(),
            requested: amount,
            held,
        });
    }

    let total_value = amount * price;
    let fee = total_value * fee_rate;
    let proceeds = total_value - fee;

    let mut updated = user.clone();
    updated.portfolio[index].amount -= amount;
    if updated.portfolio[index].amount.is_zero() {
        updated.portfolio.remove(index);
    }
    updated.balance += proceeds;

    Ok(SellOutcome {
        user: updated,
        fee,
        total_value,
    })
}

fn check_positive(amount: Decimal, price: Decimal) -> Result<(), ExchangeError> {
    if amount <= Decimal::ZERO {
        return Err(ExchangeError::InvalidRequest(
            "amount must be positive".to_string(),
        ));
    }
    if price <= Decimal::ZERO {
        return Err(ExchangeError::InvalidRequest(
            "price must be positive".to_string(),
        ));
    }
    Ok(())
}
