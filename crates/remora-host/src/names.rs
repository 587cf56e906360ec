//! Collision-free names for dynamically registered functions.
//!
//! Names are rendered from a strictly increasing counter with the digits
//! reversed, which moves the fastest-changing digit to the front of the string
//! so that prefix comparisons between generated names diverge early.

use std::sync::atomic::{AtomicU64, Ordering};

/// First counter value; the first generated name renders the next integer.
pub const INITIAL_COUNTER: u64 = 100;

/// Monotonic generator of unique names.
///
/// The driver keeps one generator for the life of the process and hands it to
/// every generation, so names never repeat across restarts.
#[derive(Debug)]
pub struct UniqueNames {
    counter: AtomicU64,
}

impl Default for UniqueNames {
    fn default() -> Self {
        Self::new()
    }
}

impl UniqueNames {
    /// Creates a generator starting at [`INITIAL_COUNTER`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(INITIAL_COUNTER),
        }
    }

    /// Advances the counter and renders the new value as a name.
    #[must_use]
    pub fn next_name(&self) -> String {
        render(self.next_value())
    }

    /// Advances the counter and returns its new value.
    #[must_use]
    pub fn next_value(&self) -> u64 {
        // `fetch_add` is the single atomic transaction; the rendered value is
        // the post-increment counter.
        self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }
}

/// Renders `value` with its decimal digits reversed.
#[must_use]
pub fn render(value: u64) -> String {
    value.to_string().chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use rstest::rstest;

    use super::*;

    fn unreverse(name: &str) -> u64 {
        name.chars()
            .rev()
            .collect::<String>()
            .parse()
            .expect("generated names are numeric")
    }

    #[test]
    fn first_name_follows_initial_counter() {
        let names = UniqueNames::new();
        assert_eq!(names.next_name(), "101");
        assert_eq!(names.next_name(), "201");
        assert_eq!(names.next_name(), "301");
    }

    #[rstest]
    #[case(110, "011")]
    #[case(1234, "4321")]
    #[case(7, "7")]
    fn renders_reversed_digits(#[case] value: u64, #[case] expected: &str) {
        assert_eq!(render(value), expected);
    }

    #[test]
    fn sequential_names_are_pairwise_distinct() {
        let names = UniqueNames::new();
        let generated: Vec<String> = (0..2_000).map(|_| names.next_name()).collect();
        let unique: HashSet<&String> = generated.iter().collect();
        assert_eq!(unique.len(), generated.len());
    }

    #[test]
    fn counters_behind_names_strictly_increase() {
        let names = UniqueNames::new();
        let generated: Vec<u64> = (0..500).map(|_| unreverse(&names.next_name())).collect();
        assert!(generated.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn reversed_comparison_preserves_order_for_equal_lengths() {
        let names = UniqueNames::new();
        let generated: Vec<String> = (0..800).map(|_| names.next_name()).collect();
        for pair in generated.windows(2) {
            let (earlier, later) = (&pair[0], &pair[1]);
            if earlier.len() != later.len() {
                continue;
            }
            let earlier_digits: String = earlier.chars().rev().collect();
            let later_digits: String = later.chars().rev().collect();
            assert!(earlier_digits < later_digits, "{earlier} vs {later}");
        }
    }

    #[test]
    fn concurrent_generation_never_collides() {
        let names = Arc::new(UniqueNames::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&names);
                thread::spawn(move || {
                    (0..250)
                        .map(|_| generator.next_name())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for name in handle.join().expect("generator thread") {
                assert!(all.insert(name));
            }
        }
        assert_eq!(all.len(), 1_000);
    }
}
