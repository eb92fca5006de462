use rand::Rng;

use crate::game_logic::models::Difficulty;

/// Returns a Fisher-Yates permutation of `items`, leaving the input untouched.
///
/// All randomness comes from `rng`, so a seeded generator reproduces the same
/// order every time.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = rng.gen_range(0..=i);
        shuffled.swap(i, j);
    }
    shuffled
}

pub fn base_points(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 10,
        Difficulty::Medium => 20,
        Difficulty::Hard => 30,
        Difficulty::Unrated => 10,
    }
}

/// Bonus for the `streak`-th consecutive correct answer.
pub fn streak_bonus(streak: u32) -> u32 {
    streak.saturating_sub(1) * 5
}

/// Simulated share of players picking each choice, in percent.
///
/// The correct choice draws from a band that depends on the tier; the
/// remainder is split randomly across the wrong choices so the total is 100.
pub fn answer_stats<R: Rng + ?Sized>(
    correct_index: usize,
    choice_count: usize,
    difficulty: Difficulty,
    rng: &mut R,
) -> Vec<u32> {
    let mut stats = vec![0u32; choice_count];
    if correct_index >= choice_count {
        return stats;
    }

    let (low, high) = match difficulty {
        Difficulty::Easy => (60, 80),
        Difficulty::Medium => (40, 60),
        Difficulty::Hard => (20, 40),
        Difficulty::Unrated => (45, 65),
    };

    let wrong: Vec<usize> = (0..choice_count).filter(|&i| i != correct_index).collect();
    let Some((last, rest)) = wrong.split_last() else {
        stats[correct_index] = 100;
        return stats;
    };

    stats[correct_index] = rng.gen_range(low..=high);
    let mut remaining = 100 - stats[correct_index];
    for &index in rest {
        let share = rng.gen_range(0..=remaining);
        stats[index] = share;
        remaining -= share;
    }
    stats[*last] = remaining;
    stats
}

pub fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
