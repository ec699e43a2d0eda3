//! Movie records and the session's title-to-id index.
//!
//! [`MovieIndex`] is a `BTreeMap`, so "the first title matching a prefix" is
//! always the lexicographically smallest one, independent of the order the
//! server listed them in.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// One entry of a `VideoLibrary.GetMovies` listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Movie {
    #[serde(rename = "movieid")]
    pub id: i64,
    pub label: String,
    #[serde(default)]
    pub year: Option<i64>,
}

/// Extract the `movies` array from a `GetMovies` result.
///
/// An empty library comes back without a `movies` member at all.
pub fn parse_movie_list(result: &Value) -> Result<Vec<Movie>, serde_json::Error> {
    match result.get("movies") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => Vec::<Movie>::deserialize(list),
    }
}

/// `result.moviedetails` of a `VideoLibrary.GetMovieDetails` reply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovieDetails {
    #[serde(rename = "movieid")]
    pub id: i64,
    pub label: String,
    pub year: Option<i64>,
    pub file: String,
    pub trailer: String,
    #[serde(rename = "imdbnumber")]
    pub imdb_number: String,
    #[serde(rename = "dateadded")]
    pub date_added: String,
    #[serde(rename = "streamdetails")]
    pub stream_details: StreamDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamDetails {
    pub video: Vec<VideoStream>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VideoStream {
    pub width: u32,
    pub height: u32,
}

impl MovieDetails {
    /// Link form of the IMDb number, or the raw value if it isn't an IMDb id.
    pub fn imdb_link(&self) -> Option<String> {
        let id = self.imdb_number.trim();
        if id.is_empty() {
            None
        } else if id.starts_with("tt") {
            Some(format!("https://www.imdb.com/title/{id}/"))
        } else {
            Some(id.to_string())
        }
    }
}

/// Title to movie-id lookup table, cached for the session.
#[derive(Debug, Clone, Default)]
pub struct MovieIndex {
    by_title: BTreeMap<String, i64>,
}

impl MovieIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn insert(&mut self, title: impl Into<String>, id: i64) {
        self.by_title.insert(title.into(), id);
    }

    /// Replace the contents with a fresh listing.
    pub fn replace(&mut self, movies: &[Movie]) {
        self.by_title = movies.iter().map(|m| (m.label.clone(), m.id)).collect();
    }

    pub fn get(&self, title: &str) -> Option<i64> {
        self.by_title.get(title).copied()
    }

    /// Titles whose lowercase form starts with the lowercase `prefix`, in
    /// index order.
    pub fn titles_with_prefix<'a>(&'a self, prefix: &str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = prefix.to_lowercase();
        self.by_title
            .keys()
            .filter(move |t| t.to_lowercase().starts_with(&prefix))
            .map(String::as_str)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.by_title.keys().map(String::as_str)
    }

    /// Resolve a token against the cached index.
    ///
    /// Integers are returned as-is without checking membership. Anything else
    /// is matched as a case-insensitive title prefix.
    pub fn resolve(&self, token: &str) -> Option<i64> {
        let token = token.trim();
        if let Ok(id) = token.parse::<i64>() {
            return Some(id);
        }
        self.titles_with_prefix(token)
            .next()
            .and_then(|title| self.get(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> MovieIndex {
        let mut idx = MovieIndex::new();
        idx.insert("Inception", 7);
        idx.insert("Interstellar", 9);
        idx.insert("Alien", 3);
        idx
    }

    #[test]
    fn numeric_token_passes_through_unchecked() {
        assert_eq!(index().resolve("42"), Some(42));
        assert_eq!(index().resolve("7"), Some(7));
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        assert_eq!(index().resolve("inc"), Some(7));
        assert_eq!(index().resolve("ALI"), Some(3));
    }

    #[test]
    fn full_title_resolves() {
        assert_eq!(index().resolve("Interstellar"), Some(9));
    }

    #[test]
    fn ambiguous_prefix_picks_lexicographically_first() {
        // "Inception" < "Interstellar"
        assert_eq!(index().resolve("in"), Some(7));
    }

    #[test]
    fn no_match_fails() {
        assert_eq!(index().resolve("zzz"), None);
    }

    #[test]
    fn prefix_listing_in_order() {
        let idx = index();
        let titles: Vec<_> = idx.titles_with_prefix("I").collect();
        assert_eq!(titles, vec!["Inception", "Interstellar"]);
    }

    #[test]
    fn movie_list_parses_and_tolerates_empty_library() {
        let result = json!({
            "limits": {"start": 0, "end": 2, "total": 2},
            "movies": [
                {"movieid": 1, "label": "A", "year": 2000},
                {"movieid": 2, "label": "B"}
            ]
        });
        let movies = parse_movie_list(&result).unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[1].year, None);

        let empty = json!({"limits": {"start": 0, "end": 0, "total": 0}});
        assert!(parse_movie_list(&empty).unwrap().is_empty());
    }

    #[test]
    fn imdb_link_forms() {
        let mut d = MovieDetails {
            imdb_number: "tt1375666".into(),
            ..Default::default()
        };
        assert_eq!(
            d.imdb_link().as_deref(),
            Some("https://www.imdb.com/title/tt1375666/")
        );
        d.imdb_number = "27205".into();
        assert_eq!(d.imdb_link().as_deref(), Some("27205"));
        d.imdb_number = String::new();
        assert_eq!(d.imdb_link(), None);
    }
}
