//! Balance simplification for expense groups.
//!
//! Runs on the client after expense payloads have been decrypted; the
//! server never sees amounts or members.

mod split;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use split::{Entry, Split, EXACT_TOLERANCE, PERCENT_TOLERANCE};

/// Money in integer minor units
pub type Amount = i64;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SettlementError {
    #[error("entry total must be positive, got {0}")]
    NonPositiveTotal(Amount),
    #[error("split has no members")]
    EmptySplit,
    #[error("a member appears twice in the split")]
    DuplicateMember,
    #[error("shares must not be negative")]
    NegativeShare,
    #[error("exact shares sum to {sum}, expected {total}")]
    ExactMismatch { total: Amount, sum: Amount },
    #[error("percentages sum to {0}, expected 100")]
    PercentageMismatch(f64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer<M> {
    pub from: M,
    pub to: M,
    pub amount: Amount,
}

/// Net position per member: positive is owed money, negative owes money
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balances<M: Ord>(BTreeMap<M, Amount>);

impl<M: Ord + Clone> Balances<M> {
    pub fn from_entries<'a, I>(entries: I) -> Result<Self, SettlementError>
    where
        I: IntoIterator<Item = &'a Entry<M>>,
        M: 'a,
    {
        let mut nets = BTreeMap::new();
        for entry in entries {
            let shares = entry.split.shares(entry.total)?;
            *nets.entry(entry.payer.clone()).or_insert(0) += entry.total;
            for (member, owed) in shares {
                *nets.entry(member).or_insert(0) -= owed;
            }
        }
        Ok(Self(nets))
    }

    pub fn net(&self, member: &M) -> Amount {
        self.0.get(member).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&M, &Amount)> {
        self.0.iter()
    }

    /// Sum of what creditors are owed
    pub fn total_owed(&self) -> Amount {
        self.0.values().filter(|v| **v > 0).sum()
    }

    pub fn is_settled(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }

    /// Balances after the given transfers have been paid
    pub fn after(&self, transfers: &[Transfer<M>]) -> Self {
        let mut nets = self.0.clone();
        for t in transfers {
            *nets.entry(t.from.clone()).or_insert(0) += t.amount;
            *nets.entry(t.to.clone()).or_insert(0) -= t.amount;
        }
        Self(nets)
    }

    /// Greedy largest-first matching of debtors against creditors.
    ///
    /// Deterministic: both sides are ordered by magnitude descending, ties by
    /// member order. Produces at most `debtors + creditors - 1` transfers.
    pub fn settle(&self) -> Vec<Transfer<M>> {
        let mut debtors: Vec<(M, Amount)> = Vec::new();
        let mut creditors: Vec<(M, Amount)> = Vec::new();
        for (member, net) in &self.0 {
            if *net < 0 {
                debtors.push((member.clone(), -net));
            } else if *net > 0 {
                creditors.push((member.clone(), *net));
            }
        }
        // stable sort keeps member order among equal magnitudes
        debtors.sort_by(|a, b| b.1.cmp(&a.1));
        creditors.sort_by(|a, b| b.1.cmp(&a.1));

        let mut transfers = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < debtors.len() && j < creditors.len() {
            let amount = debtors[i].1.min(creditors[j].1);
            transfers.push(Transfer {
                from: debtors[i].0.clone(),
                to: creditors[j].0.clone(),
                amount,
            });
            debtors[i].1 -= amount;
            creditors[j].1 -= amount;
            if debtors[i].1 == 0 {
                i += 1;
            }
            if creditors[j].1 == 0 {
                j += 1;
            }
        }
        transfers
    }
}

impl<M: Ord> FromIterator<(M, Amount)> for Balances<M> {
    fn from_iter<T: IntoIterator<Item = (M, Amount)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A validated set of entries for one group.
///
/// Nets are accumulated as entries are recorded, so an entry that does not
/// add up never reaches the ledger and balances need no second validation.
#[derive(Debug, Clone)]
pub struct Ledger<M: Ord> {
    entries: Vec<Entry<M>>,
    nets: Balances<M>,
}

impl<M: Ord> Default for Ledger<M> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            nets: Balances(BTreeMap::new()),
        }
    }
}

impl<M: Ord + Clone> Ledger<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, rejecting it if its split does not add up
    pub fn record(&mut self, entry: Entry<M>) -> Result<(), SettlementError> {
        let shares = entry.split.shares(entry.total)?;
        let nets = &mut self.nets.0;
        *nets.entry(entry.payer.clone()).or_insert(0) += entry.total;
        for (member, owed) in shares {
            *nets.entry(member).or_insert(0) -= owed;
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[Entry<M>] {
        &self.entries
    }

    pub fn total_spent(&self) -> Amount {
        self.entries.iter().map(|e| e.total).sum()
    }

    pub fn balances(&self) -> &Balances<M> {
        &self.nets
    }

    pub fn settle(&self) -> Vec<Transfer<M>> {
        self.nets.settle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(name: &str) -> String {
        name.to_string()
    }

    #[test]
    fn test_one_creditor_two_debtors() {
        let balances: Balances<String> = [(s("A"), 50), (s("B"), -30), (s("C"), -20)]
            .into_iter()
            .collect();

        let transfers = balances.settle();
        assert_eq!(
            transfers,
            vec![
                Transfer {
                    from: s("B"),
                    to: s("A"),
                    amount: 30
                },
                Transfer {
                    from: s("C"),
                    to: s("A"),
                    amount: 20
                },
            ]
        );
        let moved: Amount = transfers.iter().map(|t| t.amount).sum();
        assert_eq!(moved, balances.total_owed());
        assert!(balances.after(&transfers).is_settled());
    }

    #[test]
    fn test_settlement_is_deterministic() {
        let balances: Balances<String> = [
            (s("dee"), 40),
            (s("ana"), 40),
            (s("bo"), -40),
            (s("cy"), -40),
        ]
        .into_iter()
        .collect();

        let first = balances.settle();
        for _ in 0..10 {
            assert_eq!(balances.settle(), first);
        }
        // ties resolve by member order
        assert_eq!(first[0].from, s("bo"));
        assert_eq!(first[0].to, s("ana"));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_greedy_zeroes_every_balance() {
        let balances: Balances<u8> = [(0, 73), (1, -12), (2, -55), (3, 19), (4, -25)]
            .into_iter()
            .collect();

        let transfers = balances.settle();
        assert!(balances.after(&transfers).is_settled());
        assert!(transfers.len() <= 4);
        assert!(transfers.iter().all(|t| t.amount > 0));
    }

    #[test]
    fn test_already_settled_needs_no_transfers() {
        let balances: Balances<String> = [(s("A"), 0), (s("B"), 0)].into_iter().collect();
        assert!(balances.settle().is_empty());
    }

    #[test]
    fn test_ledger_balances_from_entries() {
        let mut ledger = Ledger::new();
        ledger
            .record(Entry {
                payer: s("ana"),
                total: 9000,
                split: Split::Equal {
                    members: vec![s("ana"), s("bo"), s("cy")],
                },
            })
            .unwrap();
        ledger
            .record(Entry {
                payer: s("bo"),
                total: 3000,
                split: Split::Exact {
                    shares: vec![(s("bo"), 1000), (s("cy"), 2000)],
                },
            })
            .unwrap();

        let balances = ledger.balances();
        assert_eq!(balances.net(&s("ana")), 6000);
        assert_eq!(balances.net(&s("bo")), -1000);
        assert_eq!(balances.net(&s("cy")), -5000);
        assert_eq!(ledger.total_spent(), 12000);

        let transfers = ledger.settle();
        assert_eq!(transfers.len(), 2);
        assert!(balances.after(&transfers).is_settled());
    }

    #[test]
    fn test_ledger_rejects_bad_entries() {
        let mut ledger: Ledger<String> = Ledger::new();
        let err = ledger.record(Entry {
            payer: s("ana"),
            total: 100,
            split: Split::Percentage {
                shares: vec![(s("ana"), 10.0)],
            },
        });
        assert!(err.is_err());
        assert!(ledger.entries().is_empty());
        assert!(ledger.balances().is_settled());
    }

    #[test]
    fn test_ledger_balances_match_recomputed_entries() {
        let mut ledger = Ledger::new();
        for entry in [
            Entry {
                payer: s("A"),
                total: 100,
                split: Split::Exact {
                    shares: vec![(s("B"), 50), (s("C"), 49)],
                },
            },
            Entry {
                payer: s("B"),
                total: 100,
                split: Split::Percentage {
                    shares: vec![(s("A"), 33.33), (s("B"), 33.33), (s("C"), 33.34)],
                },
            },
        ] {
            ledger.record(entry).unwrap();
        }
        // a rejected entry leaves the running nets untouched
        assert!(ledger
            .record(Entry {
                payer: s("C"),
                total: 100,
                split: Split::Exact {
                    shares: vec![(s("A"), 10)],
                },
            })
            .is_err());

        let recomputed = Balances::from_entries(ledger.entries()).unwrap();
        assert_eq!(ledger.balances(), &recomputed);
        assert_eq!(ledger.balances().iter().map(|(_, v)| v).sum::<Amount>(), 0);
        assert!(ledger.balances().after(&ledger.settle()).is_settled());
    }
}
