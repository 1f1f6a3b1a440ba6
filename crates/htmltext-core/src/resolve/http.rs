//! Minimal blocking HTTP/1.1 GET client used for remote images.
//!
//! Plain HTTP runs over `std::net::TcpStream`. HTTPS is available when the
//! `tls-rustls` feature is enabled.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use htmltext_types::error::{HtmlTextError, Result};

use super::Fetcher;
use super::url::Url;

/// Response bodies larger than this are rejected (8 MB).
pub const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

const MAX_REDIRECTS: u8 = 5;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(15);

fn net_err(msg: impl Into<String>) -> HtmlTextError {
    HtmlTextError::Network(msg.into())
}

/// [`Fetcher`] that performs real network requests.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_redirects: u8,
    pub user_agent: String,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            max_redirects: MAX_REDIRECTS,
            user_agent: format!("htmltext/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let mut current = url.clone();
        for _ in 0..=self.max_redirects {
            let resp = self.request(&current)?;

            if is_redirect(resp.status)
                && let Some(location) = find_header(&resp.headers, "location")
            {
                log::debug!("{current} redirected to {location}");
                current = current
                    .join(location)
                    .ok_or_else(|| net_err(format!("bad redirect location: {location}")))?;
                continue;
            }
            if !(200..300).contains(&resp.status) {
                return Err(net_err(format!("{current}: HTTP {}", resp.status)));
            }
            return Ok(resp.body);
        }
        Err(net_err(format!("{url}: too many redirects")))
    }
}

impl HttpFetcher {
    fn request(&self, url: &Url) -> Result<HttpResponse> {
        let port = url
            .effective_port()
            .ok_or_else(|| net_err(format!("unsupported scheme: {}", url.scheme)))?;
        match url.scheme.as_str() {
            "http" => {
                let mut stream = self.connect(&url.host, port)?;
                send_request(&mut stream, url, &self.user_agent)?;
                parse_response(&read_response(&mut stream)?)
            },
            "https" => self.request_tls(url, port),
            other => Err(net_err(format!("unsupported scheme: {other}"))),
        }
    }

    #[cfg(feature = "tls-rustls")]
    fn request_tls(&self, url: &Url, port: u16) -> Result<HttpResponse> {
        let stream = self.connect(&url.host, port)?;
        let mut tls = tls::wrap(stream, &url.host)?;
        send_request(&mut tls, url, &self.user_agent)?;
        parse_response(&read_response(&mut tls)?)
    }

    #[cfg(not(feature = "tls-rustls"))]
    fn request_tls(&self, url: &Url, _port: u16) -> Result<HttpResponse> {
        Err(net_err(format!("{url}: https needs the `tls-rustls` feature")))
    }

    fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| net_err(format!("DNS resolution failed for {host}: {e}")))?
            .next()
            .ok_or_else(|| net_err(format!("no addresses for {host}:{port}")))?;
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)
            .map_err(|e| net_err(format!("connect to {host}:{port}: {e}")))?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        Ok(stream)
    }
}

#[cfg(feature = "tls-rustls")]
mod tls {
    use std::net::TcpStream;
    use std::sync::{Arc, OnceLock};

    use htmltext_types::error::Result;
    use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
    use rustls_pki_types::ServerName;

    use super::net_err;

    fn config() -> Arc<ClientConfig> {
        static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
        Arc::clone(CONFIG.get_or_init(|| {
            let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            Arc::new(
                ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth(),
            )
        }))
    }

    pub(super) fn wrap(
        stream: TcpStream,
        host: &str,
    ) -> Result<StreamOwned<ClientConnection, TcpStream>> {
        let name = ServerName::try_from(host.to_owned())
            .map_err(|e| net_err(format!("invalid server name {host}: {e}")))?;
        let conn = ClientConnection::new(config(), name)
            .map_err(|e| net_err(format!("TLS init: {e}")))?;
        Ok(StreamOwned::new(conn, stream))
    }
}

// -------------------------------------------------------------------
// Wire format
// -------------------------------------------------------------------

/// A parsed HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    /// Lowercased header names.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

fn send_request(stream: &mut impl Write, url: &Url, user_agent: &str) -> Result<()> {
    let default_port = if url.scheme == "https" { 443 } else { 80 };
    let host_header = match url.port {
        Some(p) if p != default_port => format!("{}:{p}", url.host),
        _ => url.host.clone(),
    };
    let request = format!(
        "GET {} HTTP/1.1\r\n\
         Host: {host_header}\r\n\
         User-Agent: {user_agent}\r\n\
         Accept: image/*, */*;q=0.5\r\n\
         Connection: close\r\n\
         \r\n",
        url.request_target()
    );
    stream.write_all(request.as_bytes())?;
    stream.flush()?;
    Ok(())
}

/// Read until EOF or read timeout.
fn read_response(stream: &mut impl Read) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() + n > MAX_BODY_SIZE + 4096 {
                    return Err(net_err("response too large"));
                }
                buf.extend_from_slice(&chunk[..n]);
            },
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                break;
            },
            // Servers that close without TLS close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && !buf.is_empty() => break,
            Err(e) => return Err(net_err(format!("read response: {e}"))),
        }
    }
    Ok(buf)
}

/// Split raw bytes into status, headers and decoded body.
pub fn parse_response(data: &[u8]) -> Result<HttpResponse> {
    let header_end = find_subsequence(data, b"\r\n\r\n")
        .ok_or_else(|| net_err("malformed HTTP response: no header terminator"))?;
    let head = std::str::from_utf8(&data[..header_end])
        .map_err(|_| net_err("non-UTF-8 response headers"))?;
    let raw_body = &data[header_end + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .split(' ')
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| net_err(format!("bad status line: {status_line}")))?;

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let body = if find_header(&headers, "transfer-encoding").is_some_and(|v| v.contains("chunked"))
    {
        decode_chunked(raw_body)?
    } else if let Some(len) = find_header(&headers, "content-length") {
        let len: usize = len
            .parse()
            .map_err(|_| net_err(format!("bad Content-Length: {len}")))?;
        if len > MAX_BODY_SIZE {
            return Err(net_err("response body exceeds 8 MB limit"));
        }
        raw_body[..raw_body.len().min(len)].to_vec()
    } else {
        raw_body.to_vec()
    };
    if body.len() > MAX_BODY_SIZE {
        return Err(net_err("response body exceeds 8 MB limit"));
    }

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn decode_chunked(data: &[u8]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut pos = 0;
    while let Some(i) = find_subsequence(&data[pos..], b"\r\n") {
        let line_end = pos + i;
        let size_line = std::str::from_utf8(&data[pos..line_end])
            .map_err(|_| net_err("bad chunk size"))?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| net_err("bad chunk size"))?;
        if size == 0 {
            break;
        }
        if body.len() + size > MAX_BODY_SIZE {
            return Err(net_err("chunked body exceeds 8 MB limit"));
        }
        let start = line_end + 2;
        let end = start + size;
        if end > data.len() {
            // Truncated final chunk: keep what arrived.
            body.extend_from_slice(&data[start..]);
            break;
        }
        body.extend_from_slice(&data[start..end]);
        pos = (end + 2).min(data.len());
    }
    Ok(body)
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn parse_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 3\r\n\r\nabcdef";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"abc");
        assert_eq!(find_header(&resp.headers, "Content-Type"), Some("image/png"));
    }

    #[test]
    fn parse_chunked() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\n\r\n";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.body, b"Wikipedia");
    }

    #[test]
    fn parse_until_eof_without_length() {
        let resp = parse_response(b"HTTP/1.0 404 Not Found\r\n\r\ngone").unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, b"gone");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_response(b"nonsense").is_err());
        assert!(parse_response(b"HTTP/1.1 abc\r\n\r\n").is_err());
        assert!(parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: x\r\n\r\n").is_err());
    }

    #[test]
    fn oversized_content_length_rejected() {
        let raw = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_SIZE + 1
        );
        assert!(parse_response(raw.as_bytes()).is_err());
    }

    #[test]
    fn request_line_and_host_header() {
        let mut out = Vec::new();
        let url = Url::parse("http://example.com:8080/img/a.png?v=1").unwrap();
        send_request(&mut out, &url, "ua/1").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("GET /img/a.png?v=1 HTTP/1.1\r\n"));
        assert!(text.contains("Host: example.com:8080\r\n"));
        assert!(text.contains("User-Agent: ua/1\r\n"));
        assert!(text.ends_with("\r\n\r\n"));

        let mut out = Vec::new();
        let url = Url::parse("http://example.com:80/").unwrap();
        send_request(&mut out, &url, "ua/1").unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Host: example.com\r\n"));
    }

    #[test]
    fn read_response_caps_size() {
        let mut big = Cursor::new(vec![b'x'; MAX_BODY_SIZE + 8192]);
        assert!(read_response(&mut big).is_err());
    }

    #[test]
    fn unsupported_scheme() {
        let url = Url::parse("ftp://example.com/a.png").unwrap();
        let err = HttpFetcher::default().fetch(&url).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    /// Serve canned responses, one per accepted connection.
    fn serve(responses: Vec<Vec<u8>>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            for response in responses {
                let (mut conn, _) = listener.accept().unwrap();
                let mut buf = [0u8; 1024];
                let _ = conn.read(&mut buf);
                conn.write_all(&response).unwrap();
            }
        });
        port
    }

    #[test]
    fn fetch_follows_redirect() {
        let port = serve(vec![
            b"HTTP/1.1 302 Found\r\nLocation: /final.gif\r\nContent-Length: 0\r\n\r\n".to_vec(),
            b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\nGIF89a".to_vec(),
        ]);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/start.gif")).unwrap();
        let body = HttpFetcher::default().fetch(&url).unwrap();
        assert_eq!(body, b"GIF89a");
    }

    #[test]
    fn fetch_error_status() {
        let port = serve(vec![
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_vec(),
        ]);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/missing.png")).unwrap();
        let err = HttpFetcher::default().fetch(&url).unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
