//! Selection strategies for providers and topics.
//!
//! Production code picks uniformly at random; tests inject a deterministic
//! selector so that a given run always hits the same provider and topic.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Picks one index out of `len` candidates.
pub trait Selector: Send + Sync {
    /// Return an index in `0..len`. Callers never pass `len == 0`.
    fn pick(&self, len: usize) -> usize;
}

/// Uniform random selection.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl Selector for RandomSelector {
    fn pick(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always picks the same position (clamped to the last candidate).
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl Selector for FixedSelector {
    fn pick(&self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}

/// Cycles through candidates in order.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    next: AtomicUsize,
}

impl Selector for RoundRobinSelector {
    fn pick(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.next.fetch_add(1, Ordering::Relaxed) % len
    }
}

/// Pick one element of `items`, or `None` if it is empty.
pub fn choose<'a, T>(selector: &dyn Selector, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(selector.pick(items.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_stays_in_range() {
        let selector = RandomSelector;
        for _ in 0..200 {
            assert!(selector.pick(3) < 3);
        }
        assert_eq!(selector.pick(1), 0);
    }

    #[test]
    fn fixed_clamps_to_last() {
        assert_eq!(FixedSelector(1).pick(3), 1);
        assert_eq!(FixedSelector(7).pick(3), 2);
    }

    #[test]
    fn round_robin_cycles() {
        let selector = RoundRobinSelector::default();
        let picks: Vec<usize> = (0..5).map(|_| selector.pick(2)).collect();
        assert_eq!(picks, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn choose_empty_is_none() {
        let items: Vec<u8> = Vec::new();
        assert!(choose(&RandomSelector, &items).is_none());
        assert_eq!(choose(&FixedSelector(0), &[5, 6]), Some(&5));
    }
}
