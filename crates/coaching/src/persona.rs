//! Companion personas and assessment pattern descriptions.

/// A coaching companion the user can pick in their profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Companion {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

/// Companion used when the profile names none, or an unknown one.
pub const DEFAULT_COMPANION: Companion = Companion {
    key: "jing_teacher",
    name: "Coach Jing",
    icon: "🌿",
};

const COMPANIONS: &[Companion] = &[
    DEFAULT_COMPANION,
    Companion {
        key: "little_sprout",
        name: "Little Sprout",
        icon: "🌱",
    },
    Companion {
        key: "starlight",
        name: "Starlight",
        icon: "⭐",
    },
    Companion {
        key: "calm_breeze",
        name: "Calm Breeze",
        icon: "🍃",
    },
    Companion {
        key: "wise_owl",
        name: "Wise Owl",
        icon: "🦉",
    },
];

impl Companion {
    /// Look up a companion by profile key, falling back to the default.
    pub fn from_key(key: Option<&str>) -> Companion {
        key.and_then(|k| COMPANIONS.iter().find(|c| c.key == k))
            .copied()
            .unwrap_or(DEFAULT_COMPANION)
    }
}

impl Default for Companion {
    fn default() -> Self {
        DEFAULT_COMPANION
    }
}

/// Assessment pattern assumed when a session names none.
pub const DEFAULT_PATTERN: &str = "exhaustion";

/// What an emotional-health assessment pattern says about the user.
pub fn pattern_description(pattern: &str) -> Option<&'static str> {
    match pattern {
        "exhaustion" => Some(
            "has held emotions in and given too much for a long time, and is worn out in body and mind",
        ),
        "anxiety" => Some("tends to feel tense and anxious, worries about the future and finds it hard to relax"),
        "numbness" => Some(
            "feels emotionally numb, finds it hard to feel joy or sadness, as if cut off from themselves",
        ),
        "volatility" => Some("has strong mood swings, is easily affected by others and finds it hard to stay steady"),
        "suppression" => Some("habitually pushes feelings down and is reluctant to say what they really feel"),
        _ => None,
    }
}
