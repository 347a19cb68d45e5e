//! Inverse-workload weighted reviewer selection.
//!
//! A candidate with `n` recent assignments has weight `1 / (n + 1)`. Weights
//! are normalised and a single uniform draw walks the cumulative sum. The
//! selector knows nothing about labels or exclusions; it picks from whatever
//! pool it is handed.

use crate::db::workload::Workload;
use crate::models::User;
use crate::services::rng::SharedRng;

/// Weight of a candidate with `count` recent assignments.
pub fn weight(count: u32) -> f64 {
    1.0 / (f64::from(count) + 1.0)
}

#[derive(Debug, Clone)]
pub struct WeightedSelector {
    rng: SharedRng,
}

impl WeightedSelector {
    pub fn new(rng: SharedRng) -> Self {
        Self { rng }
    }

    /// Pick one user. `None` for an empty pool; a single candidate is
    /// returned without drawing.
    pub fn pick_one(&self, pool: &[User], workload: &Workload) -> Option<User> {
        self.pick_index(pool, workload).map(|i| pool[i].clone())
    }

    /// Pick `n` distinct users without replacement.
    ///
    /// When the pool has `n` or fewer users it is returned whole, in order.
    pub fn pick_many(&self, pool: &[User], n: usize, workload: &Workload) -> Vec<User> {
        if pool.len() <= n {
            return pool.to_vec();
        }

        let mut remaining = pool.to_vec();
        let mut picked = Vec::with_capacity(n);
        while picked.len() < n {
            match self.pick_index(&remaining, workload) {
                Some(i) => picked.push(remaining.remove(i)),
                None => break,
            }
        }
        picked
    }

    fn pick_index(&self, pool: &[User], workload: &Workload) -> Option<usize> {
        match pool.len() {
            0 => return None,
            1 => return Some(0),
            _ => {}
        }

        let weights: Vec<f64> = pool.iter().map(|u| weight(workload.count(u.id))).collect();
        let total: f64 = weights.iter().sum();
        let draw = self.rng.next_f64();

        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w / total;
            if draw < cumulative {
                return Some(i);
            }
        }

        // Rounding left the cumulative sum just under the draw.
        Some(self.rng.index(pool.len()))
    }
}
