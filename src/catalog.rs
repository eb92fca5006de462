use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

pub const RANDOM_CATEGORY_ID: &str = "random";
pub const DEFAULT_CATEGORY_ID: &str = "general";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
}

pub const CATEGORIES: &[Category] = &[
    Category { id: "random", name: "Random" },
    Category { id: "general", name: "General Knowledge" },
    Category { id: "history", name: "History" },
    Category { id: "science", name: "Science and Technology" },
    Category { id: "geography", name: "Geography" },
    Category { id: "sports", name: "Sports" },
    Category { id: "art", name: "Art and Music" },
    Category { id: "literature", name: "Arabic and World Literature" },
    Category { id: "nature", name: "Nature and Environment" },
    Category { id: "anime", name: "Anime and Pop Culture" },
    Category { id: "islamic", name: "Islamic Religion and Culture" },
    Category { id: "health", name: "Medicine and Health" },
    Category { id: "cinema", name: "Cinema" },
    Category { id: "gaming", name: "Video Games" },
    Category { id: "space", name: "Space" },
];

pub fn find(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

/// A concrete category to generate questions for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCategory {
    pub id: String,
    pub name: String,
}

/// Maps `random` to a uniformly chosen concrete category. Unknown ids keep
/// their id but use the general category's display name.
pub fn resolve_category<R: Rng + ?Sized>(id: &str, rng: &mut R) -> ResolvedCategory {
    let id = id.trim();
    if id == RANDOM_CATEGORY_ID {
        let concrete: Vec<&Category> = CATEGORIES
            .iter()
            .filter(|c| c.id != RANDOM_CATEGORY_ID)
            .collect();
        if let Some(chosen) = concrete.choose(rng) {
            return ResolvedCategory {
                id: chosen.id.to_string(),
                name: chosen.name.to_string(),
            };
        }
    }

    match find(id) {
        Some(category) => ResolvedCategory {
            id: category.id.to_string(),
            name: category.name.to_string(),
        },
        None => {
            let fallback = find(DEFAULT_CATEGORY_ID).map_or("General Knowledge", |c| c.name);
            tracing::debug!(category.id = %id, "Unknown category, using the general name");
            ResolvedCategory {
                id: id.to_string(),
                name: fallback.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_resolves_to_a_concrete_category() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let resolved = resolve_category("random", &mut rng);
            assert_ne!(resolved.id, RANDOM_CATEGORY_ID);
            assert!(find(&resolved.id).is_some());
        }
    }

    #[test]
    fn test_known_and_unknown_ids() {
        let mut rng = StdRng::seed_from_u64(3);
        let space = resolve_category("space", &mut rng);
        assert_eq!(space.name, "Space");

        let odd = resolve_category("pottery", &mut rng);
        assert_eq!(odd.id, "pottery");
        assert_eq!(odd.name, "General Knowledge");
    }
}
