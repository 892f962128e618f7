//! Streaming HTTP downloads into local media directories.

use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use metrics::{counter, histogram};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{MediaError, MediaResult};

/// Stream `url` into `dest`, returning the number of bytes written.
///
/// Bytes land in `<dest>.part` first and are renamed into place once the
/// body is complete, so a failed download never leaves a partial file at
/// `dest`.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> MediaResult<u64> {
    let parsed = Url::parse(url).map_err(|e| MediaError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(MediaError::InvalidUrl(format!("unsupported scheme: {}", parsed.scheme())));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let start = Instant::now();
    let result = stream_to_file(client, parsed, dest, timeout).await;

    let outcome = if result.is_ok() { "ok" } else { "error" };
    counter!("vgen_media_downloads_total", "outcome" => outcome).increment(1);
    histogram!("vgen_media_download_seconds").record(start.elapsed().as_secs_f64());

    result
}

async fn stream_to_file(
    client: &reqwest::Client,
    url: Url,
    dest: &Path,
    timeout: Duration,
) -> MediaResult<u64> {
    let response = client.get(url.clone()).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::download_failed(format!("HTTP {} from {}", status, url)));
    }

    let part = part_path(dest);
    let mut file = fs::File::create(&part).await?;
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&part).await;
                return Err(MediaError::download_failed(format!("stream interrupted: {e}")));
            }
        };
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    drop(file);

    fs::rename(&part, dest).await?;

    info!(bytes = written, dest = %dest.display(), "Downloaded artifact");
    Ok(written)
}

fn part_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// File extension of the URL path including the dot, or `default`.
pub fn extension_from_url(url: &str, default: &str) -> String {
    let ext = Url::parse(url).ok().and_then(|u| {
        let last = u.path_segments()?.next_back()?.to_string();
        let (_, ext) = last.rsplit_once('.')?;
        (!ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .then(|| format!(".{}", ext.to_ascii_lowercase()))
    });

    match ext {
        Some(ext) => ext,
        None => {
            debug!(url, default, "No usable extension in URL");
            default.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_from_url("https://cdn.x/a/clip.MP4?sig=1", ".mp4"), ".mp4");
        assert_eq!(extension_from_url("https://cdn.x/a/voice.wav", ".mp3"), ".wav");
        assert_eq!(extension_from_url("https://cdn.x/a/noext", ".mp3"), ".mp3");
        assert_eq!(extension_from_url("https://cdn.x/", ".mp4"), ".mp4");
        assert_eq!(extension_from_url("not a url", ".mp4"), ".mp4");
    }

    #[test]
    fn test_part_path() {
        assert_eq!(part_path(Path::new("/o/a.mp4")), Path::new("/o/a.mp4.part"));
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/a.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake video".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out").join("a.mp4");
        let url = format!("{}/files/a.mp4", server.uri());

        let bytes = download_to_file(&reqwest::Client::new(), &url, &dest, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(bytes, 10);
        assert_eq!(fs::read(&dest).await.unwrap(), b"fake video");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_download_http_error_leaves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.mp4");
        let url = format!("{}/missing.mp4", server.uri());

        let err = download_to_file(&reqwest::Client::new(), &url, &dest, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::DownloadFailed { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_rejects_non_http_scheme() {
        let dir = TempDir::new().unwrap();
        let err = download_to_file(
            &reqwest::Client::new(),
            "file:///etc/passwd",
            &dir.path().join("x"),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::InvalidUrl(_)));
    }
}
