use std::cmp::Reverse;

use crate::models::Profile;

/// Cards shown per feed load.
pub const FEED_LIMIT: usize = 10;

/// Orders the candidate pool for one viewer.
///
/// The viewer's own profile and any profile without an interest list are
/// dropped. Every remaining candidate is scored by how many of its interest
/// entries name a category the viewer also has, then sorted descending by
/// score; the sort is stable, so ties keep the store's order. Zero-score
/// candidates stay in. If the viewer has no profile in the pool there is
/// nothing to score against and the first candidates are returned as-is.
pub fn rank(profiles: Vec<Profile>, actor_id: &str) -> Vec<Profile> {
    let actor_categories: Option<Vec<String>> = profiles
        .iter()
        .find(|profile| profile.uid == actor_id)
        .map(|actor| {
            actor
                .passions
                .iter()
                .flatten()
                .map(|interest| interest.category.clone())
                .collect()
        });

    let mut eligible: Vec<Profile> = profiles
        .into_iter()
        .filter(|profile| profile.uid != actor_id && profile.passions.is_some())
        .collect();

    let Some(actor_categories) = actor_categories else {
        eligible.truncate(FEED_LIMIT);
        return eligible;
    };

    eligible.sort_by_key(|candidate| Reverse(shared_count(candidate, &actor_categories)));
    eligible.truncate(FEED_LIMIT);
    eligible
}

/// How many of the candidate's interest entries fall in the viewer's
/// categories. Counts entries, not distinct categories.
fn shared_count(candidate: &Profile, actor_categories: &[String]) -> usize {
    candidate
        .passions
        .iter()
        .flatten()
        .filter(|interest| actor_categories.contains(&interest.category))
        .count()
}
