use regex::Regex;

lazy_static::lazy_static! {
    static ref SEASON_NAME: Regex = Regex::new(r"(?i)(?:^|[^a-z])season[ ._-]*\d{1,3}(?:[^0-9]|$)").unwrap();
    static ref SEASON_SHORT: Regex = Regex::new(r"(?i)^s\d{1,2}$").unwrap();
    static ref EPISODE_SXE: Regex = Regex::new(r"(?i)(?:^|[^a-z0-9])s(\d{1,2})[ ._-]?e(\d{1,3})(?:[^0-9]|$)").unwrap();
    static ref EPISODE_NXN: Regex = Regex::new(r"(?i)(?:^|[^a-z0-9])(\d{1,2})x(\d{2,3})(?:[^0-9a-z]|$)").unwrap();
    static ref YEAR: Regex = Regex::new(r"(?i)(?:^|[^0-9a-z])(19\d{2}|20\d{2})(?:[^0-9a-z]|$)").unwrap();
    static ref CHAPTER: Regex = Regex::new(r"(?i)(?:^|[^a-z])(?:chapter|chap|ch|part|pt)[ ._-]*\d+").unwrap();
}

/// `Season 2`, `season_02`, or a bare `S02` directory.
pub fn is_season_name(name: &str) -> bool {
    SEASON_NAME.is_match(name) || SEASON_SHORT.is_match(name.trim())
}

pub fn has_episode_marker(name: &str) -> bool {
    episode_numbers(name).is_some()
}

/// `(season, episode)` from `S01E02` or `1x02` style markers.
pub fn episode_numbers(name: &str) -> Option<(u32, u32)> {
    let caps = EPISODE_SXE
        .captures(name)
        .or_else(|| EPISODE_NXN.captures(name))?;
    let season = caps.get(1)?.as_str().parse().ok()?;
    let episode = caps.get(2)?.as_str().parse().ok()?;
    Some((season, episode))
}

pub fn first_year(name: &str) -> Option<u16> {
    YEAR.captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn has_chapter_token(name: &str) -> bool {
    CHAPTER.is_match(name)
}
