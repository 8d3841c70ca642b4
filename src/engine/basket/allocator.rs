use indexmap::IndexMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, warn};

/// Smallest basket the store accepts.
pub const MIN_BASKET_SIZE: u64 = 16;
/// Basket sizes must be multiples of this.
pub const BASKET_ALIGNMENT: u64 = 8;

/// Planned buffering of one output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchStat {
    pub name: String,
    /// Bytes of this column summed over all inputs
    pub total_bytes: u64,
    pub basket_count: u64,
    pub basket_size: u64,
}

impl BranchStat {
    fn spare(&self) -> u64 {
        self.total_bytes / self.basket_count - self.total_bytes / (self.basket_count + 1)
    }
}

/// Result of [`BasketAllocator::optimize`], in input column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasketPlan {
    pub branches: Vec<BranchStat>,
    pub iterations: u64,
}

impl BasketPlan {
    pub fn get(&self, name: &str) -> Option<&BranchStat> {
        self.branches.iter().find(|b| b.name == name)
    }

    pub fn total_memory(&self) -> u64 {
        self.branches.iter().map(|b| b.basket_size).sum()
    }

    pub fn total_baskets(&self) -> u64 {
        self.branches.iter().map(|b| b.basket_count).sum()
    }

    pub fn min_basket_size(&self) -> Option<u64> {
        self.branches.iter().map(|b| b.basket_size).min()
    }

    pub fn max_basket_size(&self) -> Option<u64> {
        self.branches.iter().map(|b| b.basket_size).max()
    }
}

/// Spreads a memory budget over per-column baskets.
///
/// Every column starts with a single basket holding all of its bytes. While
/// the sum of basket sizes is not below the budget, the column whose size drops
/// the most by adding one basket gets that basket (lowest index on ties).
/// Refinement stops early when no column can shrink any further.
#[derive(Debug, Clone, Copy)]
pub struct BasketAllocator {
    budget_bytes: u64,
}

impl BasketAllocator {
    pub fn new(budget_bytes: u64) -> Self {
        Self { budget_bytes }
    }

    pub fn optimize(&self, branch_totals: &IndexMap<String, u64>) -> BasketPlan {
        let mut branches: Vec<BranchStat> = branch_totals
            .iter()
            .map(|(name, &total)| BranchStat {
                name: name.clone(),
                total_bytes: total,
                basket_count: 1,
                basket_size: total,
            })
            .collect();

        let mut total: u64 = branches.iter().map(|b| b.basket_size).sum();
        let mut candidates: BinaryHeap<(u64, Reverse<usize>)> = branches
            .iter()
            .enumerate()
            .filter(|(_, b)| b.spare() > 0)
            .map(|(i, b)| (b.spare(), Reverse(i)))
            .collect();

        let mut iterations = 0u64;
        while total >= self.budget_bytes {
            let Some((_, Reverse(idx))) = candidates.pop() else {
                warn!(
                    target: "basket::allocator",
                    total,
                    budget = self.budget_bytes,
                    "No column can shrink further, stopping above budget"
                );
                break;
            };
            let branch = &mut branches[idx];
            let before = branch.basket_size;
            branch.basket_count += 1;
            branch.basket_size = branch.total_bytes / branch.basket_count;
            total -= before - branch.basket_size;
            iterations += 1;

            let spare = branch.spare();
            if spare > 0 {
                candidates.push((spare, Reverse(idx)));
            }
        }

        for branch in branches.iter_mut() {
            let aligned = branch.basket_size - branch.basket_size % BASKET_ALIGNMENT;
            branch.basket_size = aligned.max(MIN_BASKET_SIZE);
        }

        debug!(
            target: "basket::allocator",
            columns = branches.len(),
            iterations,
            budget = self.budget_bytes,
            "Basket plan computed"
        );
        BasketPlan {
            branches,
            iterations,
        }
    }
}

/// Convenience wrapper around [`BasketAllocator::optimize`].
pub fn optimize(branch_totals: &IndexMap<String, u64>, budget_bytes: u64) -> BasketPlan {
    BasketAllocator::new(budget_bytes).optimize(branch_totals)
}
