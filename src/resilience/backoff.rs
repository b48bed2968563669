//! Exponential backoff with symmetric jitter.

use std::time::Duration;

use rand::Rng;

/// Undithered delay before retry number `attempt` (1-based).
///
/// `min(max_delay, initial_delay * exponential_base^(attempt - 1))`.
pub fn base_delay(
    attempt: u32,
    initial_delay: Duration,
    max_delay: Duration,
    exponential_base: f64,
) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let secs = initial_delay.as_secs_f64() * exponential_base.powi(exponent);
    if !secs.is_finite() || secs >= max_delay.as_secs_f64() {
        return max_delay;
    }
    Duration::from_secs_f64(secs.max(0.0))
}

/// Scale `delay` by a factor drawn from `[1 - jitter_factor, 1 + jitter_factor]`,
/// floored at zero and capped at `max_delay`.
pub fn apply_jitter<R: Rng + ?Sized>(
    delay: Duration,
    jitter_factor: f64,
    max_delay: Duration,
    rng: &mut R,
) -> Duration {
    if jitter_factor <= 0.0 {
        return delay.min(max_delay);
    }

    let factor = rng.gen_range((1.0 - jitter_factor)..=(1.0 + jitter_factor));
    let secs = (delay.as_secs_f64() * factor).max(0.0);
    Duration::from_secs_f64(secs).min(max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL: Duration = Duration::from_millis(100);
    const MAX: Duration = Duration::from_secs(2);

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(base_delay(0, INITIAL, MAX, 2.0), Duration::ZERO);
        assert_eq!(base_delay(1, INITIAL, MAX, 2.0), Duration::from_millis(100));
        assert_eq!(base_delay(2, INITIAL, MAX, 2.0), Duration::from_millis(200));
        assert_eq!(base_delay(3, INITIAL, MAX, 2.0), Duration::from_millis(400));
        assert_eq!(base_delay(10, INITIAL, MAX, 2.0), MAX);
    }

    #[test]
    fn test_base_delay_is_monotonic_and_capped() {
        let mut previous = Duration::ZERO;
        for attempt in 1..200 {
            let d = base_delay(attempt, INITIAL, MAX, 3.0);
            assert!(d >= previous);
            assert!(d <= MAX);
            previous = d;
        }
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let mut rng = rand::thread_rng();
        let base = Duration::from_secs(1);
        for _ in 0..500 {
            let d = apply_jitter(base, 0.25, Duration::from_secs(10), &mut rng);
            assert!(d >= Duration::from_millis(750));
            assert!(d <= Duration::from_millis(1250));
        }
    }

    #[test]
    fn test_jitter_never_exceeds_max() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let d = apply_jitter(MAX, 0.5, MAX, &mut rng);
            assert!(d <= MAX);
        }
    }

    #[test]
    fn test_full_jitter_floors_at_zero() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let d = apply_jitter(Duration::from_millis(10), 1.0, MAX, &mut rng);
            assert!(d <= Duration::from_millis(20));
        }
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        use rand::{rngs::StdRng, SeedableRng};

        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| apply_jitter(Duration::from_secs(1), 0.1, MAX, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
    }
}
