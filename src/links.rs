//! Symmetric bone links: named bone-sets, optionally scoped to one
//! tribe/gender combination, whose members mirror each other's rotation and
//! scale while posing.

/// Body type of the posed character, as far as link rules care.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Gender {
    Masculine,
    Feminine,
}

/// What the host knows about the actor behind a skeleton. Only link-rule
/// filtering consumes this; bones and channels never do.
#[derive(Clone, Debug, Default)]
pub struct ActorProfile {
    /// Tribe identifier as the host names it; the standard rules use
    /// `"Rava"` and `"Veena"`.
    pub tribe: Option<String>,
    pub gender: Option<Gender>,
}

/// One set of bones kept in lock-step. An unscoped set applies to every
/// actor; a scoped one only when the profile matches.
#[derive(Clone, Debug)]
pub struct LinkSet {
    tribe: Option<&'static str>,
    gender: Option<Gender>,
    bones: Vec<&'static str>,
}

impl LinkSet {
    pub fn new(bones: &[&'static str]) -> Self {
        Self {
            tribe: None,
            gender: None,
            bones: bones.to_vec(),
        }
    }

    pub fn scoped(tribe: &'static str, gender: Gender, bones: &[&'static str]) -> Self {
        Self {
            tribe: Some(tribe),
            gender: Some(gender),
            bones: bones.to_vec(),
        }
    }

    pub fn applies_to(&self, profile: &ActorProfile) -> bool {
        if let Some(tribe) = self.tribe {
            if profile.tribe.as_deref() != Some(tribe) {
                return false;
            }
        }
        if let Some(gender) = self.gender {
            if profile.gender != Some(gender) {
                return false;
            }
        }
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bones.iter().any(|bone| *bone == name)
    }

    /// The members of this set other than `name`.
    pub fn others<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.bones.iter().copied().filter(move |bone| *bone != name)
    }
}

/// The built-in link table: paired eyes for everyone, and the long-ear
/// variant chains per tribe and gender (the feminine skeletons pair ear
/// shapes a/b/d, the masculine ones a/c/d).
pub fn standard_links() -> Vec<LinkSet> {
    use Gender::{Feminine, Masculine};

    let mut links = vec![LinkSet::new(&["j_f_eye_r", "j_f_eye_l"])];

    for tribe in ["Rava", "Veena"] {
        links.push(LinkSet::scoped(
            tribe,
            Feminine,
            &["j_zera_a_l", "j_zerb_a_l", "j_zerd_a_l"],
        ));
        links.push(LinkSet::scoped(
            tribe,
            Feminine,
            &["j_zera_a_r", "j_zerb_a_r", "j_zerd_a_r"],
        ));
        links.push(LinkSet::scoped(
            tribe,
            Feminine,
            &["j_zera_b_l", "j_zerb_b_l", "j_zerd_b_l"],
        ));
        links.push(LinkSet::scoped(
            tribe,
            Feminine,
            &["j_zera_b_r", "j_zerb_b_r", "j_zerd_b_r"],
        ));

        links.push(LinkSet::scoped(
            tribe,
            Masculine,
            &["j_zera_a_l", "j_zerc_a_l", "j_zerd_a_l"],
        ));
        links.push(LinkSet::scoped(
            tribe,
            Masculine,
            &["j_zera_a_r", "j_zerc_a_r", "j_zerd_a_r"],
        ));
        links.push(LinkSet::scoped(
            tribe,
            Masculine,
            &["j_zera_b_l", "j_zerc_b_l", "j_zerd_b_l"],
        ));
        links.push(LinkSet::scoped(
            tribe,
            Masculine,
            &["j_zera_b_r", "j_zerc_b_r", "j_zerd_b_r"],
        ));
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unscoped_sets_apply_to_everyone() {
        let eyes = LinkSet::new(&["j_f_eye_r", "j_f_eye_l"]);
        assert!(eyes.applies_to(&ActorProfile::default()));
        assert!(eyes.applies_to(&ActorProfile {
            tribe: Some("Dunesfolk".to_string()),
            gender: Some(Gender::Masculine),
        }));
    }

    #[test]
    fn scoped_sets_require_matching_profile() {
        let ears = LinkSet::scoped("Rava", Gender::Feminine, &["j_zera_a_l", "j_zerb_a_l"]);

        let matching = ActorProfile {
            tribe: Some("Rava".to_string()),
            gender: Some(Gender::Feminine),
        };
        assert!(ears.applies_to(&matching));

        let wrong_gender = ActorProfile {
            tribe: Some("Rava".to_string()),
            gender: Some(Gender::Masculine),
        };
        assert!(!ears.applies_to(&wrong_gender));

        let wrong_tribe = ActorProfile {
            tribe: Some("Veena".to_string()),
            gender: Some(Gender::Feminine),
        };
        assert!(!ears.applies_to(&wrong_tribe));

        assert!(!ears.applies_to(&ActorProfile::default()));
    }

    #[test]
    fn others_excludes_the_bone_itself() {
        let ears = LinkSet::scoped(
            "Veena",
            Gender::Masculine,
            &["j_zera_a_l", "j_zerc_a_l", "j_zerd_a_l"],
        );
        let others: Vec<_> = ears.others("j_zerc_a_l").collect();
        assert_eq!(others, ["j_zera_a_l", "j_zerd_a_l"]);
    }

    #[test]
    fn standard_table_pairs_eyes_and_ears() {
        let links = standard_links();
        assert!(links[0].contains("j_f_eye_l") && links[0].contains("j_f_eye_r"));

        // 1 eye set + 8 scoped sets for each of the two tribes.
        assert_eq!(links.len(), 17);
    }
}
