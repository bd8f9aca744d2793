//! Folder and file name parsing used to derive library names.

use regex::Regex;

lazy_static::lazy_static! {
    static ref BRACKETED: Regex = Regex::new(r"\s*[\[\(\{][^\]\)\}]*[\]\)\}]").unwrap();
    static ref RELEASE_JUNK: Regex = Regex::new(
        r"(?i)\b(bluray|blu-ray|brrip|bdrip|dvdrip|webrip|web-dl|webdl|hdtv|pdtv|hdcam|hdrip|1080p|720p|480p|2160p|4k|uhd|x264|x265|h264|h265|hevc|xvid|divx|aac|ac3|dts|proper|repack|internal|limited|extended|unrated|complete|multi|subbed|dubbed)\b.*$"
    ).unwrap();
    static ref ILLEGAL: Regex = Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref TV_SXE: Regex = Regex::new(r"(?i)^(.+?)[\s._-]+s(\d{1,2})[\s._-]?e\d{1,3}").unwrap();
    static ref TV_SEASON_WORD: Regex = Regex::new(r"(?i)^(.+?)[\s._-]+season[\s._-]*(\d{1,3})").unwrap();
    static ref TV_SEASON_SHORT: Regex = Regex::new(r"(?i)^(.+?)[\s._-]+s(\d{1,2})(?:[\s._-]|$)").unwrap();
    static ref SEASON_ONLY: Regex = Regex::new(r"(?i)^(?:season[\s._-]*|s)(\d{1,3})$").unwrap();
    static ref MOVIE_PAREN_YEAR: Regex = Regex::new(r"^(.+?)\s*\((\d{4})\)").unwrap();
    static ref MOVIE_BARE_YEAR: Regex = Regex::new(r"^(.+?)[\s._\[\(-]+((?:19|20)\d{2})(?:[\s._\]\)-]|$)").unwrap();
    static ref ARTIST_SPLIT: Regex = Regex::new(r"^(.+?)\s+-\s+(.+)$").unwrap();
    static ref TITLE_BY_AUTHOR: Regex = Regex::new(r"(?i)^(.+?)\s+by\s+(.+)$").unwrap();
    static ref TRAILING_YEAR: Regex = Regex::new(r"\s*[\(\[]?(?:19|20)\d{2}[\)\]]?\s*$").unwrap();
    static ref LANG_TAG: Regex = Regex::new(r"(?i)\.([a-z]{2,3}(?:[-_][a-z]{2})?)$").unwrap();
}

/// Remove characters illegal on common filesystems, collapse whitespace and
/// trim trailing dots/spaces. Case is preserved.
pub fn sanitize(name: &str) -> String {
    let stripped = ILLEGAL.replace_all(name, "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed
        .trim()
        .trim_end_matches(|c: char| c == '.' || c == ' ')
        .to_string()
}

/// Turn a scene-style name into a readable title: separators to spaces,
/// bracketed groups and release tags removed, then sanitized.
pub fn clean_title(raw: &str) -> String {
    let mut title = raw.trim().to_string();
    if !title.contains(' ') {
        title = title.replace(['.', '_'], " ");
    }
    let title = BRACKETED.replace_all(&title, "");
    let title = RELEASE_JUNK.replace(&title, "");
    let title = sanitize(&title);
    title
        .trim_matches(|c: char| c == '-' || c == '_' || c == '.' || c.is_whitespace())
        .to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Show title and season from a TV folder name.
pub fn parse_tv_folder(folder: &str) -> (Option<String>, Option<u32>) {
    let folder = folder.trim();
    if let Some(c) = SEASON_ONLY.captures(folder) {
        return (None, c[1].parse().ok());
    }
    for pattern in [&*TV_SXE, &*TV_SEASON_WORD, &*TV_SEASON_SHORT] {
        if let Some(c) = pattern.captures(folder) {
            let title = TRAILING_YEAR.replace(&c[1], "");
            return (non_empty(clean_title(&title)), c[2].parse().ok());
        }
    }
    (non_empty(clean_title(folder)), None)
}

/// Season number named by a directory such as `Season 02` or `S02`.
pub fn season_of_dir(name: &str) -> Option<u32> {
    let name = name.trim();
    if let Some(c) = SEASON_ONLY.captures(name) {
        return c[1].parse().ok();
    }
    TV_SEASON_WORD
        .captures(name)
        .and_then(|c| c[2].parse().ok())
}

/// Movie title and year from a folder name.
pub fn parse_movie_folder(folder: &str) -> (Option<String>, Option<u16>) {
    let folder = folder.trim();
    let caps = MOVIE_PAREN_YEAR
        .captures(folder)
        .or_else(|| MOVIE_BARE_YEAR.captures(folder));
    match caps {
        Some(c) => (non_empty(clean_title(&c[1])), c[2].parse().ok()),
        None => (non_empty(clean_title(folder)), None),
    }
}

/// `Artist - Album`; anything else is treated as an album name.
pub fn parse_music_folder(folder: &str) -> (Option<String>, Option<String>) {
    let folder = folder.trim();
    if let Some(c) = ARTIST_SPLIT.captures(folder) {
        let album = TRAILING_YEAR.replace(&c[2], "");
        return (non_empty(clean_title(&c[1])), non_empty(clean_title(&album)));
    }
    (None, non_empty(clean_title(folder)))
}

/// `Author - Title` or `Title by Author`; anything else is a title.
pub fn parse_audiobook_folder(folder: &str) -> (Option<String>, Option<String>) {
    let folder = folder.trim();
    if let Some(c) = ARTIST_SPLIT.captures(folder) {
        return (non_empty(clean_title(&c[1])), non_empty(clean_title(&c[2])));
    }
    if let Some(c) = TITLE_BY_AUTHOR.captures(folder) {
        return (non_empty(clean_title(&c[2])), non_empty(clean_title(&c[1])));
    }
    (None, non_empty(clean_title(folder)))
}

/// Trailing language tag of a subtitle stem, e.g. `en` in `movie.en`.
pub fn subtitle_language(stem: &str) -> Option<String> {
    LANG_TAG.captures(stem).map(|c| c[1].to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("What If...?"), "What If");
        assert_eq!(sanitize("AC/DC: Live"), "ACDC Live");
        assert_eq!(sanitize("  Spaced    Out  "), "Spaced Out");
        assert_eq!(sanitize("Keep Case"), "Keep Case");
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("The.Office.US"), "The Office US");
        assert_eq!(clean_title("Inception.1080p.BluRay.x264"), "Inception");
        assert_eq!(clean_title("Heat [Remastered] (Director's Cut)"), "Heat");
        assert_eq!(clean_title("some_show"), "some show");
    }

    #[test]
    fn test_parse_tv_folder() {
        assert_eq!(parse_tv_folder("The Office Season 01"), (Some("The Office".into()), Some(1)));
        assert_eq!(parse_tv_folder("The.Office.S02.720p"), (Some("The Office".into()), Some(2)));
        assert_eq!(parse_tv_folder("Lost S03E01 Hdtv"), (Some("Lost".into()), Some(3)));
        assert_eq!(parse_tv_folder("Doctor Who (2005) Season 4"), (Some("Doctor Who".into()), Some(4)));
        assert_eq!(parse_tv_folder("The Office"), (Some("The Office".into()), None));
        assert_eq!(parse_tv_folder("Season 03"), (None, Some(3)));
    }

    #[test]
    fn test_season_of_dir() {
        assert_eq!(season_of_dir("Season 02"), Some(2));
        assert_eq!(season_of_dir("S3"), Some(3));
        assert_eq!(season_of_dir("Extras"), None);
    }

    #[test]
    fn test_parse_movie_folder() {
        assert_eq!(parse_movie_folder("Inception (2010)"), (Some("Inception".into()), Some(2010)));
        assert_eq!(
            parse_movie_folder("Blade.Runner.1982.1080p.BluRay"),
            (Some("Blade Runner".into()), Some(1982))
        );
        assert_eq!(parse_movie_folder("Heat"), (Some("Heat".into()), None));
    }

    #[test]
    fn test_parse_music_and_audiobook() {
        assert_eq!(
            parse_music_folder("Pink Floyd - The Wall (1979)"),
            (Some("Pink Floyd".into()), Some("The Wall".into()))
        );
        assert_eq!(parse_music_folder("Greatest Hits"), (None, Some("Greatest Hits".into())));
        assert_eq!(
            parse_audiobook_folder("Dune by Frank Herbert"),
            (Some("Frank Herbert".into()), Some("Dune".into()))
        );
        assert_eq!(
            parse_audiobook_folder("Frank Herbert - Dune"),
            (Some("Frank Herbert".into()), Some("Dune".into()))
        );
    }

    #[test]
    fn test_subtitle_language() {
        assert_eq!(subtitle_language("Inception.en"), Some("en".into()));
        assert_eq!(subtitle_language("Inception.pt-BR"), Some("pt-br".into()));
        assert_eq!(subtitle_language("Inception"), None);
    }
}
