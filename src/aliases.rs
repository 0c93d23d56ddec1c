use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Short and colloquial spellings mapped to the full club name.
/// Values must never appear as keys so that canonicalising is idempotent.
const ALIASES: &[(&str, &str)] = &[
    ("Man Utd", "Manchester United"),
    ("Man United", "Manchester United"),
    ("Manchester Utd", "Manchester United"),
    ("MUFC", "Manchester United"),
    ("Man City", "Manchester City"),
    ("MCFC", "Manchester City"),
    ("Spurs", "Tottenham Hotspur"),
    ("Tottenham", "Tottenham Hotspur"),
    ("Wolves", "Wolverhampton Wanderers"),
    ("Newcastle", "Newcastle United"),
    ("Nott'm Forest", "Nottingham Forest"),
    ("Nottm Forest", "Nottingham Forest"),
    ("Forest", "Nottingham Forest"),
    ("West Ham", "West Ham United"),
    ("Brighton", "Brighton & Hove Albion"),
    ("Brighton and Hove Albion", "Brighton & Hove Albion"),
    ("Villa", "Aston Villa"),
    ("Palace", "Crystal Palace"),
    ("Leicester", "Leicester City"),
    ("Ipswich", "Ipswich Town"),
    ("Sheffield Utd", "Sheffield United"),
    ("Leeds", "Leeds United"),
    ("Atleti", "Atletico Madrid"),
    ("Atlético Madrid", "Atletico Madrid"),
    ("Barca", "Barcelona"),
    ("Barça", "Barcelona"),
    ("Real", "Real Madrid"),
    ("Inter", "Inter Milan"),
    ("Internazionale", "Inter Milan"),
    ("Milan", "AC Milan"),
    ("Juve", "Juventus"),
    ("Bayern", "Bayern Munich"),
    ("Bayern München", "Bayern Munich"),
    ("BVB", "Borussia Dortmund"),
    ("Dortmund", "Borussia Dortmund"),
    ("Gladbach", "Borussia Monchengladbach"),
    ("Leverkusen", "Bayer Leverkusen"),
    ("PSG", "Paris Saint Germain"),
    ("Paris SG", "Paris Saint Germain"),
    ("OM", "Marseille"),
];

static TABLE: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ALIASES.iter().copied().collect());

/// Maps a known alias to its canonical name; anything else comes back trimmed.
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    TABLE
        .get(trimmed)
        .map(|name| (*name).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

pub fn known_aliases() -> impl Iterator<Item = (&'static str, &'static str)> {
    ALIASES.iter().copied()
}
