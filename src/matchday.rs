/// How a matchday number was recovered from a provider round label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matchday {
    /// "Regular Season - 12"
    Delimited(u32),
    /// "12"
    Numeric(u32),
    /// "Matchday 12", "Round12"
    Embedded(u32),
    Unknown,
}

impl Matchday {
    /// 0 when unknown.
    pub fn number(&self) -> u32 {
        match self {
            Matchday::Delimited(n) | Matchday::Numeric(n) | Matchday::Embedded(n) => *n,
            Matchday::Unknown => 0,
        }
    }
}

const SEPARATORS: &[&str] = &[" - ", " – ", " — "];

/// Fallback order: separator then number, whole label numeric, first digit run, unknown.
pub fn parse_matchday(label: &str) -> Matchday {
    let label = label.trim();
    if label.is_empty() {
        return Matchday::Unknown;
    }

    for sep in SEPARATORS {
        if let Some((_, tail)) = label.split_once(sep)
            && let Some(n) = leading_number(tail.trim())
        {
            return Matchday::Delimited(n);
        }
    }

    if let Ok(n) = label.parse::<u32>() {
        return Matchday::Numeric(n);
    }

    if let Some(n) = label
        .split(|ch: char| !ch.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse::<u32>().ok())
    {
        return Matchday::Embedded(n);
    }

    Matchday::Unknown
}

fn leading_number(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u32>().ok()
}

/// Matchday buckets offered when browsing a team's cards.
pub const MATCHDAY_RANGES: &[(u32, u32)] = &[
    (1, 5),
    (6, 10),
    (11, 15),
    (16, 20),
    (21, 25),
    (26, 30),
    (31, 35),
    (36, 38),
];

/// `"6-10"` or `"7"`. `"all"` and anything unparseable mean no filter.
pub fn parse_matchday_range(raw: &str) -> Option<(u32, u32)> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return None;
    }
    let (lo, hi) = match raw.split_once('-') {
        Some((lo, hi)) => (lo.trim().parse::<u32>().ok()?, hi.trim().parse::<u32>().ok()?),
        None => {
            let n = raw.parse::<u32>().ok()?;
            (n, n)
        }
    };
    Some((lo.min(hi), lo.max(hi)))
}
