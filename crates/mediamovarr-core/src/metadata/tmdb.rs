use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{MetadataError, MetadataSource, SearchHit, Throttle};
use crate::config::MetadataConfig;
use crate::model::MediaType;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Blocking TMDb v3 client.
pub struct TmdbClient {
    http: Client,
    api_key: String,
    base_url: String,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MovieResult {
    title: String,
    #[serde(default)]
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TvResult {
    id: u64,
    name: String,
    #[serde(default)]
    first_air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TvDetails {
    #[serde(default)]
    number_of_seasons: Option<u32>,
}

impl TmdbClient {
    pub fn new(config: &MetadataConfig) -> Result<Self, MetadataError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
        })
    }

    fn get<T: for<'de> Deserialize<'de>>(
        &self,
        throttle: &mut Throttle,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, MetadataError> {
        let url = format!("{}{}", self.base_url, path);
        let mut query: Vec<(&str, String)> = vec![("api_key", self.api_key.clone())];
        if let Some(lang) = &self.language {
            query.push(("language", lang.clone()));
        }
        query.extend(params.iter().cloned());

        throttle.wait();
        debug!("GET {}", url);
        let response = self.http.get(&url).query(&query).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status(status.as_u16()));
        }
        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| MetadataError::Malformed(e.to_string()))
    }

    fn search_movie(
        &self,
        throttle: &mut Throttle,
        title: &str,
        year: Option<u16>,
    ) -> Result<Option<SearchHit>, MetadataError> {
        let mut params = vec![("query", title.to_string())];
        if let Some(y) = year {
            params.push(("year", y.to_string()));
        }
        let response: SearchResponse<MovieResult> = self.get(throttle, "/search/movie", &params)?;
        Ok(response.results.into_iter().next().map(|r| SearchHit {
            year: date_year(r.release_date.as_deref()),
            title: r.title,
            season_count: None,
        }))
    }

    fn search_tv(
        &self,
        throttle: &mut Throttle,
        title: &str,
        year: Option<u16>,
    ) -> Result<Option<SearchHit>, MetadataError> {
        let mut params = vec![("query", title.to_string())];
        if let Some(y) = year {
            params.push(("first_air_date_year", y.to_string()));
        }
        let response: SearchResponse<TvResult> = self.get(throttle, "/search/tv", &params)?;
        let top = match response.results.into_iter().next() {
            Some(top) => top,
            None => return Ok(None),
        };
        let details: TvDetails = self.get(throttle, &format!("/tv/{}", top.id), &[])?;
        Ok(Some(SearchHit {
            year: date_year(top.first_air_date.as_deref()),
            title: top.name,
            season_count: details.number_of_seasons,
        }))
    }
}

impl MetadataSource for TmdbClient {
    fn search(
        &self,
        throttle: &mut Throttle,
        media_type: MediaType,
        title: &str,
        year: Option<u16>,
    ) -> Result<Option<SearchHit>, MetadataError> {
        match media_type {
            MediaType::Movie => self.search_movie(throttle, title, year),
            MediaType::Tv => self.search_tv(throttle, title, year),
            other => Err(MetadataError::Unsupported(other)),
        }
    }
}

/// Year from a `YYYY-MM-DD` date; empty strings are common in TMDb payloads.
fn date_year(date: Option<&str>) -> Option<u16> {
    date.and_then(|d| d.get(0..4)).and_then(|y| y.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Instant;

    /// Answer one request per body, in order, and record when each arrived.
    fn serve(bodies: Vec<&'static str>) -> (String, thread::JoinHandle<Vec<(Instant, String)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for body in bodies {
                let (mut stream, _) = listener.accept().unwrap();
                let arrived = Instant::now();
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let line = String::from_utf8_lossy(&request)
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
                .unwrap();
                seen.push((arrived, line));
            }
            seen
        });
        (format!("http://{}", addr), handle)
    }

    /// Talks straight to `base_url`, ignoring any proxy in the environment.
    fn client(base_url: String) -> TmdbClient {
        TmdbClient {
            http: Client::builder()
                .no_proxy()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap(),
            api_key: "k".into(),
            base_url,
            language: None,
        }
    }

    #[test]
    fn test_date_year() {
        assert_eq!(date_year(Some("2010-07-15")), Some(2010));
        assert_eq!(date_year(Some("")), None);
        assert_eq!(date_year(None), None);
    }

    #[test]
    fn test_decode_movie_search() {
        let body = r#"{"page":1,"results":[{"id":27205,"title":"Inception","release_date":"2010-07-15"}]}"#;
        let parsed: SearchResponse<MovieResult> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results[0].title, "Inception");
    }

    #[test]
    fn test_decode_tv_search_without_date() {
        let body = r#"{"results":[{"id":2316,"name":"The Office","first_air_date":null}]}"#;
        let parsed: SearchResponse<TvResult> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results[0].id, 2316);
        assert!(parsed.results[0].first_air_date.is_none());
    }

    #[test]
    fn test_unreachable_host_is_error() {
        let client = client("http://127.0.0.1:9".into());
        let mut throttle = Throttle::new(Duration::ZERO);
        assert!(client.search(&mut throttle, MediaType::Movie, "Inception", None).is_err());
        assert!(matches!(
            client.search(&mut throttle, MediaType::Music, "x", None),
            Err(MetadataError::Unsupported(MediaType::Music))
        ));
        assert_eq!(throttle.requests(), 1);
    }

    #[test]
    fn test_tv_lookup_throttles_each_request() {
        let (base_url, server) = serve(vec![
            r#"{"results":[{"id":2316,"name":"The Office","first_air_date":"2005-03-24"}]}"#,
            r#"{"id":2316,"number_of_seasons":9}"#,
        ]);
        let client = client(base_url);
        let mut throttle = Throttle::new(Duration::from_millis(100));

        let hit = client
            .search(&mut throttle, MediaType::Tv, "The Office", None)
            .unwrap()
            .unwrap();
        assert_eq!(hit.title, "The Office");
        assert_eq!(hit.year, Some(2005));
        assert_eq!(hit.season_count, Some(9));
        assert_eq!(throttle.requests(), 2);

        let seen = server.join().unwrap();
        assert!(seen[0].1.contains("/search/tv"));
        assert!(seen[1].1.contains("/tv/2316"));
        assert!(seen[1].0.duration_since(seen[0].0) >= Duration::from_millis(80));
    }
}
