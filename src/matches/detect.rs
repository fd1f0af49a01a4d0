use crate::models::{InteractionRecord, LikeAction, Profile, UserMatch};

/// Derives the actor's mutual matches from raw like records.
///
/// Walks the actor's outgoing likes; for each target, checks the target's own
/// records for a like pointing back. Only a reciprocated like is a match.
/// Targets whose profile is missing from `profiles` are dropped without
/// error. Passes never match in either direction.
pub fn find_matches(
    actor_id: &str,
    all_likes: &[InteractionRecord],
    profiles: &[Profile],
) -> Vec<UserMatch> {
    let mut matches = Vec::new();

    let outgoing = all_likes
        .iter()
        .filter(|like| like.user_id == actor_id && like.action == LikeAction::Like);

    for like in outgoing {
        let target = like.matched_user_id.as_str();
        let reciprocated = all_likes
            .iter()
            .filter(|theirs| theirs.user_id == target)
            .any(|theirs| theirs.matched_user_id == actor_id && theirs.action == LikeAction::Like);
        if !reciprocated {
            continue;
        }

        let Some(profile) = profiles.iter().find(|p| p.uid == target) else {
            continue;
        };
        matches.push(user_match_for(profile));
    }

    matches
}

/// A match card for one profile; the message preview fields stay defaulted.
pub(crate) fn user_match_for(profile: &Profile) -> UserMatch {
    UserMatch {
        uid: profile.uid.clone(),
        name: profile.name.clone(),
        photo: profile.primary_photo().to_owned(),
        last_message: String::new(),
        last_message_time: None,
        unread_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::like_key;

    fn like(actor: &str, target: &str) -> InteractionRecord {
        InteractionRecord {
            user_id: actor.to_owned(),
            matched_user_id: target.to_owned(),
            action: LikeAction::Like,
            timestamp: 0,
        }
    }

    fn pass(actor: &str, target: &str) -> InteractionRecord {
        InteractionRecord {
            action: LikeAction::Pass,
            ..like(actor, target)
        }
    }

    fn profile(uid: &str, photos: &[&str]) -> Profile {
        Profile {
            uid: uid.to_owned(),
            name: format!("name-{uid}"),
            last_name: String::new(),
            email: format!("{uid}@example.com"),
            birthdate: "2000-01-01".to_owned(),
            gender: "other".to_owned(),
            show_gender_profile: true,
            passions: Some(vec![]),
            photos: photos.iter().map(|p| p.to_string()).collect(),
            country: "ES".to_owned(),
            city: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn matched_uids(matches: &[UserMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.uid.as_str()).collect()
    }

    #[test]
    fn reciprocal_likes_match_from_both_sides() {
        let likes = [like("a", "b"), like("b", "a")];
        let profiles = [profile("a", &[]), profile("b", &["/files/b.jpg"])];

        assert_eq!(matched_uids(&find_matches("a", &likes, &profiles)), ["b"]);
        assert_eq!(matched_uids(&find_matches("b", &likes, &profiles)), ["a"]);
    }

    #[test]
    fn one_sided_like_is_no_match() {
        let likes = [like("a", "b")];
        let profiles = [profile("a", &[]), profile("b", &[])];
        assert!(find_matches("a", &likes, &profiles).is_empty());
        assert!(find_matches("b", &likes, &profiles).is_empty());
    }

    #[test]
    fn a_pass_in_either_direction_is_no_match() {
        let profiles = [profile("a", &[]), profile("b", &[])];

        let likes = [like("a", "b"), pass("b", "a")];
        assert!(find_matches("a", &likes, &profiles).is_empty());

        let likes = [pass("a", "b"), like("b", "a")];
        assert!(find_matches("a", &likes, &profiles).is_empty());
    }

    #[test]
    fn missing_profiles_are_dropped_silently() {
        let likes = [
            like("a", "b"),
            like("b", "a"),
            like("a", "gone"),
            like("gone", "a"),
        ];
        let profiles = [profile("a", &[]), profile("b", &[])];
        assert_eq!(matched_uids(&find_matches("a", &likes, &profiles)), ["b"]);
    }

    #[test]
    fn card_carries_first_name_and_primary_photo() {
        let likes = [like("a", "b"), like("b", "a")];
        let profiles = [profile("a", &[]), profile("b", &["/files/b1.jpg", "/files/b2.jpg"])];

        let matches = find_matches("a", &likes, &profiles);
        assert_eq!(matches[0].name, "name-b");
        assert_eq!(matches[0].photo, "/files/b1.jpg");
        assert_eq!(matches[0].last_message, "");
        assert_eq!(matches[0].last_message_time, None);
        assert_eq!(matches[0].unread_count, 0);
    }

    #[test]
    fn photo_defaults_to_empty_when_the_profile_has_none() {
        let likes = [like("a", "b"), like("b", "a")];
        let profiles = [profile("a", &[]), profile("b", &[])];
        assert_eq!(find_matches("a", &likes, &profiles)[0].photo, "");
    }

    #[test]
    fn like_keys_compose_actor_then_target() {
        assert_eq!(like_key("a", "b"), "a_b");
        assert_eq!(like_key("b", "a"), "b_a");
    }
}
