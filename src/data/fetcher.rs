use log::debug;
use percent_encoding::percent_decode_str;
use reqwest::blocking::Client;
use reqwest::Url;

use crate::error::FetchError;

/// File name used when the URL path has no usable last segment.
const FALLBACK_FILE_NAME: &str = "download";

// ---------------------------------------------------------------------------
// RawContent – downloaded bytes plus where they came from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RawContent {
    pub url: Url,
    pub bytes: Vec<u8>,
}

impl RawContent {
    pub fn new(url: Url, bytes: Vec<u8>) -> Self {
        RawContent { url, bytes }
    }

    /// Percent-decoded last segment of the URL path. Segments that decode to
    /// nothing, to a dot entry or to something containing a path separator
    /// fall back to `download`.
    pub fn file_name(&self) -> String {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .filter(|s| !matches!(s.as_str(), "" | "." | ".."))
            .filter(|s| !s.contains(['/', '\\']))
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
    }

    /// Lowercased text after the final `.` of the file name, or `""`.
    pub fn extension_hint(&self) -> String {
        self.file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Fetchers
// ---------------------------------------------------------------------------

/// Anything that can turn a URL into raw bytes.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<RawContent, FetchError>;
}

/// Parse `input` as an absolute URL.
pub fn parse_url(input: &str) -> Result<Url, FetchError> {
    Url::parse(input.trim()).map_err(|e| FetchError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })
}

/// Blocking HTTP GET with transport defaults for timeouts and redirects.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(Client::builder().build()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<RawContent, FetchError> {
        let url = parse_url(url)?;
        debug!("GET {url}");

        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().map_err(transport)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                code: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().map_err(transport)?;
        debug!("received {} bytes from {url}", bytes.len());

        Ok(RawContent::new(url, bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer a single HTTP request on a loopback port with `response`.
    fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            loop {
                line.clear();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}")
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::with_client(Client::builder().no_proxy().build().unwrap())
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn fetches_body_on_success() {
        let base = serve_once(http_response("200 OK", "a,b\n1,2\n"));
        let fetcher = fetcher();

        let raw = fetcher.fetch(&format!("{base}/files/cars.csv")).unwrap();

        assert_eq!(raw.bytes, b"a,b\n1,2\n");
        assert_eq!(raw.file_name(), "cars.csv");
        assert_eq!(raw.extension_hint(), "csv");
    }

    #[test]
    fn not_found_is_http_status_error() {
        let base = serve_once(http_response("404 Not Found", "nope"));
        let fetcher = fetcher();

        let err = fetcher.fetch(&format!("{base}/missing.csv")).unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus { code: 404, .. }));
    }

    #[test]
    fn refused_connection_is_transport_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let fetcher = fetcher();

        let err = fetcher.fetch(&format!("http://{addr}/a.csv")).unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[test]
    fn relative_url_is_rejected_before_any_request() {
        let err = parse_url("data/cars.csv").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn extension_hint_uses_last_segment_only() {
        let raw = |u: &str| RawContent::new(Url::parse(u).unwrap(), Vec::new());

        assert_eq!(raw("https://host/v1.2/Report.XLSX").extension_hint(), "xlsx");
        assert_eq!(raw("https://host/a.b/data?x=1.csv").extension_hint(), "");
        assert_eq!(raw("https://host/export").extension_hint(), "");
        assert_eq!(raw("https://host/").file_name(), "download");
    }

    #[test]
    fn file_name_is_percent_decoded() {
        let raw = |u: &str| RawContent::new(Url::parse(u).unwrap(), Vec::new());

        let spaced = raw("https://host/exports/my%20cars.CSV");
        assert_eq!(spaced.file_name(), "my cars.CSV");
        assert_eq!(spaced.extension_hint(), "csv");

        assert_eq!(raw("https://host/%E2%82%AC.json").file_name(), "€.json");
    }

    #[test]
    fn encoded_separators_fall_back_to_default_name() {
        let raw = |u: &str| RawContent::new(Url::parse(u).unwrap(), Vec::new());

        assert_eq!(raw("https://host/..%2Fetc%2Fpasswd.csv").file_name(), "download");
        assert_eq!(raw("https://host/a%5Cb.csv").file_name(), "download");
        assert_eq!(raw("https://host/files/%2E%2E").file_name(), "download");
    }
}
