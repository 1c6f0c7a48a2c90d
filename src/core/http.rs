use std::{
    fs::{
        self,
        File,
    },
    io::{
        BufWriter,
        Write,
    },
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

use reqwest::{
    blocking::{
        Client,
        Response,
    },
    header::{
        ACCEPT_ENCODING,
        USER_AGENT,
    },
};

use crate::core::SuggestError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// Forvo rejects requests without a browser-like agent.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub fn http_client(timeout: Duration) -> Result<Client, SuggestError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SuggestError::Custom(format!("HTTP client build failed: {e}")))
}

/// Downloads `url` into `path`, retrying failed attempts twice. The body is
/// written to a `.part` sibling and renamed into place only once complete,
/// so a failed download never leaves a file at `path`.
pub fn download_to_file(client: &Client, url: &str, path: &Path) -> Result<(), SuggestError> {
    let partial = partial_path(path);
    let result = download_attempts(client, url, &partial).and_then(|n| {
        fs::rename(&partial, path)?;
        tracing::debug!("Downloaded {} bytes from {} to {:?}", n, url, path);
        Ok(())
    });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

fn download_attempts(client: &Client, url: &str, partial: &Path) -> Result<u64, SuggestError> {
    let mut attempts: usize = 0;
    loop {
        attempts += 1;

        let resp = client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT_ENCODING, "identity")
            .send();

        let mut resp = match resp {
            Ok(r) => r,
            Err(e) => {
                if attempts < 3 {
                    tracing::warn!("GET {} failed (attempt {}): {}", url, attempts, e);
                    std::thread::sleep(Duration::from_secs(2 * attempts as u64));
                    continue;
                }
                return Err(SuggestError::Custom(format!("Failed HTTP GET {}: {}", url, e)));
            }
        };

        ensure_success(&resp)?;

        let mut writer = BufWriter::new(File::create(partial).map_err(|e| {
            SuggestError::Custom(format!("Create download file {:?} failed: {}", partial, e))
        })?);

        let copied = resp
            .copy_to(&mut writer)
            .map_err(|e| e.to_string())
            .and_then(|n| writer.flush().map(|_| n).map_err(|e| e.to_string()));
        let reason = match copied {
            Ok(n) if n > 0 => return Ok(n),
            Ok(_) => "empty body".to_string(),
            Err(e) => e,
        };
        if attempts < 3 {
            tracing::warn!("Reading body of {} failed (attempt {}): {}", url, attempts, reason);
            std::thread::sleep(Duration::from_secs(2 * attempts as u64));
            continue;
        }
        return Err(SuggestError::Custom(format!(
            "Failed to copy response body from {} to file: {}",
            url, reason
        )));
    }
}

pub fn ensure_success(resp: &Response) -> Result<(), SuggestError> {
    if !resp.status().is_success() {
        return Err(SuggestError::Custom(format!(
            "HTTP error {} from {}",
            resp.status(),
            resp.url()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io::Read,
        net::TcpListener,
        thread,
    };

    use super::*;

    /// Serves `responses` to successive connections, one raw HTTP reply each.
    fn serve(responses: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/word.jpg")
    }

    #[test]
    fn test_truncated_body_leaves_no_file() {
        let truncated = "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n";
        let url = serve(vec![truncated; 3]);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("word.jpg");

        let client = http_client(Duration::from_secs(5)).unwrap();
        assert!(download_to_file(&client, &url, &target).is_err());
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[test]
    fn test_complete_body_is_moved_into_place() {
        let url = serve(vec!["HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc"]);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("word.jpg");

        let client = http_client(Duration::from_secs(5)).unwrap();
        download_to_file(&client, &url, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"abc");
        assert!(!partial_path(&target).exists());
    }
}
