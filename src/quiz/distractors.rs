use rand::Rng;

pub const MIN_VALUE: i64 = -100;
pub const MAX_VALUE: i64 = 1000;
pub const COUNT: usize = 3;

/// Consecutive rejections before the drawing range doubles.
const WIDEN_AFTER: u32 = 16;
/// Random draws before the leftover slots are filled deterministically.
const MAX_DRAWS: u32 = 256;

/// Three plausible wrong answers around `correct`: distinct, never `correct`,
/// always inside `[MIN_VALUE, MAX_VALUE]`.
pub fn distractors<R: Rng + ?Sized>(correct: i64, rng: &mut R) -> [i64; COUNT] {
    let mut picked: Vec<i64> = Vec::with_capacity(COUNT);
    let mut range = initial_range(correct);
    let mut rejected = 0;

    for _ in 0..MAX_DRAWS {
        if picked.len() == COUNT {
            break;
        }
        let delta = rng.gen_range(1..=range);
        let candidate = if rng.gen_bool(0.5) {
            correct.saturating_add(delta)
        } else {
            correct.saturating_sub(delta)
        };

        if is_acceptable(candidate, correct, &picked) {
            picked.push(candidate);
            rejected = 0;
        } else {
            rejected += 1;
            if rejected == WIDEN_AFTER {
                range = range.saturating_mul(2);
                rejected = 0;
            }
        }
    }

    if picked.len() < COUNT {
        log::debug!("distractor draws exhausted for {correct}, filling by proximity");
        fill_nearest(correct, &mut picked);
    }

    [picked[0], picked[1], picked[2]]
}

fn initial_range(correct: i64) -> i64 {
    // floor(|correct| * 0.2) + 2
    (correct.saturating_abs() / 5 + 2).max(2)
}

fn is_acceptable(candidate: i64, correct: i64, picked: &[i64]) -> bool {
    candidate != correct
        && (MIN_VALUE..=MAX_VALUE).contains(&candidate)
        && !picked.contains(&candidate)
}

/// Walks the allowed interval outward from `correct` (clamped into it).
fn fill_nearest(correct: i64, picked: &mut Vec<i64>) {
    let center = correct.clamp(MIN_VALUE, MAX_VALUE);
    let span = MAX_VALUE - MIN_VALUE;
    for distance in 0..=span {
        for candidate in [center - distance, center + distance] {
            if picked.len() == COUNT {
                return;
            }
            if is_acceptable(candidate, correct, picked) {
                picked.push(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn check(correct: i64, values: [i64; COUNT]) {
        for (i, value) in values.iter().enumerate() {
            assert_ne!(*value, correct, "distractor equals the correct answer");
            assert!(
                (MIN_VALUE..=MAX_VALUE).contains(value),
                "{value} is out of bounds"
            );
            assert!(!values[i + 1..].contains(value), "duplicate {value}");
        }
    }

    #[test]
    fn small_values_stay_close() {
        let mut rng = StdRng::seed_from_u64(3);
        for correct in 0..=24 {
            let values = distractors(correct, &mut rng);
            check(correct, values);
            // range starts at 2..=6 here, widening twice would still stay under 24
            assert!(values.iter().all(|v| (v - correct).abs() <= 24));
        }
    }

    #[test]
    fn zero_gets_three_distinct_neighbours() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let values = distractors(0, &mut rng);
            check(0, values);
        }
    }

    #[test]
    fn values_near_the_bounds_terminate() {
        let mut rng = StdRng::seed_from_u64(5);
        for correct in [-100, -99, 999, 1000] {
            for _ in 0..50 {
                check(correct, distractors(correct, &mut rng));
            }
        }
    }

    #[test]
    fn values_outside_the_bounds_fall_back_inside() {
        let mut rng = StdRng::seed_from_u64(9);
        let values = distractors(5_000, &mut rng);
        check(5_000, values);
        let values = distractors(i64::MIN, &mut rng);
        check(i64::MIN, values);
    }

    #[test]
    fn fill_nearest_prefers_closest_values() {
        let mut picked = Vec::new();
        fill_nearest(1000, &mut picked);
        assert_eq!(picked, vec![999, 998, 997]);
    }
}
