use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Amount, SettlementError};

/// Largest accepted gap between exact shares and the entry total
pub const EXACT_TOLERANCE: Amount = 1;
/// Largest accepted gap between the percentage sum and 100
pub const PERCENT_TOLERANCE: f64 = 0.01;

/// How an entry's total is divided among the members sharing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Split<M> {
    Equal { members: Vec<M> },
    Exact { shares: Vec<(M, Amount)> },
    Percentage { shares: Vec<(M, f64)> },
}

/// One line of the ledger: who paid, how much, and who shares it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<M> {
    pub payer: M,
    /// In integer minor units (cents)
    pub total: Amount,
    pub split: Split<M>,
}

impl<M: Ord + Clone> Split<M> {
    pub fn members(&self) -> Vec<&M> {
        match self {
            Split::Equal { members } => members.iter().collect(),
            Split::Exact { shares } => shares.iter().map(|(m, _)| m).collect(),
            Split::Percentage { shares } => shares.iter().map(|(m, _)| m).collect(),
        }
    }

    /// What each member owes for `total`, in list order
    pub fn shares(&self, total: Amount) -> Result<Vec<(M, Amount)>, SettlementError> {
        if total <= 0 {
            return Err(SettlementError::NonPositiveTotal(total));
        }

        let members = self.members();
        if members.is_empty() {
            return Err(SettlementError::EmptySplit);
        }
        let mut seen = BTreeSet::new();
        if !members.iter().all(|m| seen.insert(*m)) {
            return Err(SettlementError::DuplicateMember);
        }

        match self {
            Split::Equal { members } => Ok(equal_shares(members, total)),
            Split::Exact { shares } => {
                if shares.iter().any(|(_, amount)| *amount < 0) {
                    return Err(SettlementError::NegativeShare);
                }
                let sum: Amount = shares.iter().map(|(_, amount)| amount).sum();
                if (sum - total).abs() > EXACT_TOLERANCE {
                    return Err(SettlementError::ExactMismatch { total, sum });
                }
                Ok(absorb_residual(shares.clone(), total))
            }
            Split::Percentage { shares } => {
                if shares.iter().any(|(_, pct)| !pct.is_finite() || *pct < 0.0) {
                    return Err(SettlementError::NegativeShare);
                }
                let sum: f64 = shares.iter().map(|(_, pct)| pct).sum();
                if (sum - 100.0).abs() > PERCENT_TOLERANCE {
                    return Err(SettlementError::PercentageMismatch(sum));
                }
                Ok(percentage_shares(shares, sum, total))
            }
        }
    }
}

/// Move the gap between `total` and the shares onto the largest share
/// (first one on ties) so an accepted entry always sums to `total`.
///
/// Only used within `EXACT_TOLERANCE`, where the largest share is at least 1.
fn absorb_residual<M>(mut shares: Vec<(M, Amount)>, total: Amount) -> Vec<(M, Amount)> {
    let residual = total - shares.iter().map(|(_, amount)| amount).sum::<Amount>();
    if residual == 0 {
        return shares;
    }

    let mut largest = 0;
    for (i, (_, amount)) in shares.iter().enumerate() {
        if *amount > shares[largest].1 {
            largest = i;
        }
    }
    shares[largest].1 += residual;
    shares
}

/// Largest-remainder apportionment of `total` by percentage.
///
/// Percentages are scaled by their actual sum, every member gets the floor
/// of their exact share, and the leftover units go one each to the largest
/// fractional parts (list order on ties). Shares are never negative and
/// always sum to `total`.
fn percentage_shares<M: Clone>(
    shares: &[(M, f64)],
    pct_sum: f64,
    total: Amount,
) -> Vec<(M, Amount)> {
    let exact: Vec<f64> = shares
        .iter()
        .map(|(_, pct)| {
            if pct_sum > 0.0 {
                total as f64 * pct / pct_sum
            } else {
                0.0
            }
        })
        .collect();
    let mut amounts: Vec<Amount> = exact.iter().map(|x| x.floor() as Amount).collect();

    let leftover = (total - amounts.iter().sum::<Amount>()).max(0) as usize;
    let mut by_fraction: Vec<usize> = (0..shares.len()).collect();
    // stable sort keeps list order among equal fractions
    by_fraction.sort_by(|a, b| {
        let fa = exact[*a] - exact[*a].floor();
        let fb = exact[*b] - exact[*b].floor();
        fb.total_cmp(&fa)
    });
    for i in by_fraction.into_iter().cycle().take(leftover) {
        amounts[i] += 1;
    }

    shares
        .iter()
        .zip(amounts)
        .map(|((m, _), amount)| (m.clone(), amount))
        .collect()
}

/// Integer division with the remainder handed out one unit at a time,
/// first members first, so the shares always sum to `total`
fn equal_shares<M: Clone>(members: &[M], total: Amount) -> Vec<(M, Amount)> {
    let n = members.len() as Amount;
    let base = total / n;
    let remainder = (total % n) as usize;

    members
        .iter()
        .enumerate()
        .map(|(i, m)| (m.clone(), base + Amount::from(i < remainder)))
        .collect()
}
