use rand::Rng;

use crate::game_logic::models::{GameMode, GameSettings, Question};
use crate::game_logic::utils::{shuffle, unix_millis};

/// A slice must be longer than this to receive a surprise question.
const SURPRISE_MIN_EXCLUSIVE: usize = 2;

/// Turns a raw pool into the ordered, sliced, choice-shuffled questions of
/// one session.
///
/// The caller's pool is only read; every returned question is a fresh copy.
pub fn prepare_questions<R: Rng + ?Sized>(
    pool: &[Question],
    settings: &GameSettings,
    rng: &mut R,
) -> Vec<Question> {
    prepare_questions_at(pool, settings, rng, unix_millis())
}

/// Same as [`prepare_questions`] with an explicit generation stamp for the
/// fallback ids, so repeated calls can be compared.
pub fn prepare_questions_at<R: Rng + ?Sized>(
    pool: &[Question],
    settings: &GameSettings,
    rng: &mut R,
    generated_at: i64,
) -> Vec<Question> {
    let with_ids: Vec<Question> = pool
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let mut question = question.clone();
            if question.id.is_empty() {
                question.id = format!("q-{}-{}", index, generated_at);
            }
            question.is_surprise = false;
            question.is_skipped = false;
            question
        })
        .collect();

    let ordered = if settings.shuffle_questions {
        shuffle(&with_ids, rng)
    } else {
        with_ids
    };

    let limit = question_limit(settings, ordered.len());
    let mut selected: Vec<Question> = ordered.into_iter().take(limit).collect();

    if selected.len() > SURPRISE_MIN_EXCLUSIVE && settings.game_mode != GameMode::Versus {
        let surprise_index = rng.gen_range(0..selected.len());
        selected[surprise_index].is_surprise = true;
    }

    tracing::debug!(
        pool.size = pool.len(),
        selected.count = selected.len(),
        game.mode = %settings.game_mode,
        shuffle.questions = settings.shuffle_questions,
        shuffle.choices = settings.shuffle_choices,
        "Prepared question pool"
    );

    if !settings.shuffle_choices {
        return selected;
    }

    selected
        .into_iter()
        .map(|question| shuffle_choices(question, rng))
        .collect()
}

/// Count-limited modes play `total_questions`; the others use the whole pool.
pub fn question_limit(settings: &GameSettings, pool_len: usize) -> usize {
    if settings.game_mode.is_count_limited() {
        settings.total_questions.min(pool_len)
    } else {
        pool_len
    }
}

fn shuffle_choices<R: Rng + ?Sized>(mut question: Question, rng: &mut R) -> Question {
    let tagged: Vec<(usize, String)> = question.choices.drain(..).enumerate().collect();
    let shuffled = shuffle(&tagged, rng);

    if let Some(new_index) = shuffled
        .iter()
        .position(|(original, _)| *original == question.answer_index)
    {
        question.answer_index = new_index;
    }
    question.choices = shuffled.into_iter().map(|(_, label)| label).collect();
    question
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_logic::models::Difficulty;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn make_pool(size: usize) -> Vec<Question> {
        (0..size)
            .map(|i| Question {
                id: format!("id-{}", i),
                prompt: format!("Question {}", i),
                choices: (0..4).map(|c| format!("Q{} choice {}", i, c)).collect(),
                answer_index: i % 4,
                explanation: None,
                difficulty: Difficulty::Medium,
                image_url: None,
                sources: None,
                is_skipped: false,
                is_surprise: false,
            })
            .collect()
    }

    fn settings(
        mode: GameMode,
        total: usize,
        shuffle_questions: bool,
        shuffle_choices: bool,
    ) -> GameSettings {
        GameSettings {
            shuffle_questions,
            shuffle_choices,
            total_questions: total,
            game_mode: mode,
            ..GameSettings::default()
        }
    }

    #[test]
    fn test_classic_without_shuffle_keeps_order_and_marks_one_surprise() {
        let pool = make_pool(5);
        let mut rng = StdRng::seed_from_u64(11);
        let prepared =
            prepare_questions(&pool, &settings(GameMode::Classic, 5, false, false), &mut rng);

        assert_eq!(prepared.len(), 5);
        for (prepared_q, original) in prepared.iter().zip(&pool) {
            assert_eq!(prepared_q.id, original.id);
            assert_eq!(prepared_q.choices, original.choices);
            assert_eq!(prepared_q.answer_index, original.answer_index);
        }
        assert_eq!(prepared.iter().filter(|q| q.is_surprise).count(), 1);
        assert!(pool.iter().all(|q| !q.is_surprise));
    }

    #[test]
    fn test_shuffled_choices_keep_the_correct_text() {
        let pool = make_pool(12);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let prepared =
                prepare_questions(&pool, &settings(GameMode::Survival, 5, true, true), &mut rng);
            for question in &prepared {
                let original = pool.iter().find(|q| q.id == question.id).unwrap();
                assert_eq!(question.correct_choice(), original.correct_choice());
                let mut original_choices = original.choices.clone();
                let mut shuffled_choices = question.choices.clone();
                original_choices.sort();
                shuffled_choices.sort();
                assert_eq!(original_choices, shuffled_choices);
            }
        }
    }

    #[test]
    fn test_output_length_follows_mode_limit() {
        let pool = make_pool(8);
        let mut rng = StdRng::seed_from_u64(5);

        let classic =
            prepare_questions(&pool, &settings(GameMode::Classic, 5, true, true), &mut rng);
        assert_eq!(classic.len(), 5);

        let versus =
            prepare_questions(&pool, &settings(GameMode::Versus, 20, true, true), &mut rng);
        assert_eq!(versus.len(), 8);

        for mode in [
            GameMode::TimeAttack,
            GameMode::Speedrun,
            GameMode::SuddenDeath,
            GameMode::Survival,
        ] {
            let prepared = prepare_questions(&pool, &settings(mode, 3, true, true), &mut rng);
            assert_eq!(prepared.len(), 8, "mode {} should use the whole pool", mode);
        }
    }

    #[test]
    fn test_surprise_rules() {
        let mut rng = StdRng::seed_from_u64(9);

        let versus =
            prepare_questions(&make_pool(6), &settings(GameMode::Versus, 6, true, false), &mut rng);
        assert_eq!(versus.iter().filter(|q| q.is_surprise).count(), 0);

        let short = prepare_questions(
            &make_pool(2),
            &settings(GameMode::Survival, 3, true, false),
            &mut rng,
        );
        assert_eq!(short.len(), 2);
        assert_eq!(short.iter().filter(|q| q.is_surprise).count(), 0);

        let three = prepare_questions(
            &make_pool(3),
            &settings(GameMode::Classic, 3, true, false),
            &mut rng,
        );
        assert_eq!(three.iter().filter(|q| q.is_surprise).count(), 1);
    }

    #[test]
    fn test_stale_flags_from_the_pool_are_cleared() {
        let mut pool = make_pool(4);
        pool[0].is_surprise = true;
        pool[1].is_surprise = true;
        pool[2].is_skipped = true;
        let mut rng = StdRng::seed_from_u64(2);
        let prepared =
            prepare_questions(&pool, &settings(GameMode::Classic, 4, false, false), &mut rng);
        assert_eq!(prepared.iter().filter(|q| q.is_surprise).count(), 1);
        assert!(prepared.iter().all(|q| !q.is_skipped));
    }

    #[test]
    fn test_missing_ids_get_fallbacks() {
        let mut pool = make_pool(3);
        pool[1].id.clear();
        let mut rng = StdRng::seed_from_u64(4);
        let prepared = prepare_questions_at(
            &pool,
            &settings(GameMode::Classic, 3, false, false),
            &mut rng,
            1_700_000_000_000,
        );
        assert_eq!(prepared[1].id, "q-1-1700000000000");
        assert_eq!(prepared[0].id, "id-0");
    }

    #[test]
    fn test_same_seed_gives_identical_output() {
        let mut pool = make_pool(10);
        pool[3].id.clear();
        let settings = settings(GameMode::Classic, 6, true, true);
        let first = prepare_questions_at(&pool, &settings, &mut StdRng::seed_from_u64(77), 1);
        let second = prepare_questions_at(&pool, &settings, &mut StdRng::seed_from_u64(77), 1);
        assert_eq!(first, second);
    }
}
