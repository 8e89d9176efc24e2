use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("write failed: {0}")]
    IoError(#[from] std::io::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Characters that must not end up in a file name on disk.
const HOSTILE_CHARS: &[char] = &['|', '\'', '"', ':', '\\', '/', '?', '*'];

/// Build the authenticated direct-download address for one part. The part
/// key is appended to the server address as-is; only the token is encoded.
pub fn part_download_url(base_url: &str, part_key: &str, token: &str) -> String {
    format!(
        "{}{}?download=1&X-Plex-Token={}",
        base_url.trim_end_matches('/'),
        part_key,
        urlencoding::encode(token)
    )
}

/// Derive a file name from a part's library path: its last path segment,
/// stripped of anything the filesystem would object to.
pub fn part_file_name(part_key: &str) -> String {
    let path = part_key.split('?').next().unwrap_or(part_key);
    let segment = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("");
    let name = segment.replace(HOSTILE_CHARS, "");

    if name.is_empty() {
        "download".to_string()
    } else {
        name
    }
}

/// First free path for `name` inside `dir`: `name.ext`, then `name (1).ext`
/// and so on. Existing files are never overwritten.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut n = 1;
    loop {
        let alternative = match ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(alternative);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Stream one part to `dest`, returning the number of bytes written.
pub async fn fetch_part(client: &Client, url: &str, dest: &Path) -> Result<u64, DownloadError> {
    let mut response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(DownloadError::InvalidResponse(format!(
            "status: {}",
            response.status()
        )));
    }

    let total = response.content_length().unwrap_or(0);
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.green/blue}] {percent}%",
        )
        .unwrap()
        .progress_chars("#>-"),
    );

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(dest).await?;
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    pb.finish_and_clear();

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_part_download_url() {
        let url = part_download_url("https://1.2.3.4:32400", "/library/parts/1", "srvTok");
        assert_eq!(
            url,
            "https://1.2.3.4:32400/library/parts/1?download=1&X-Plex-Token=srvTok"
        );
    }

    #[test]
    fn test_part_download_url_trims_trailing_slash() {
        let url = part_download_url("https://1.2.3.4:32400/", "/library/parts/1", "srvTok");
        assert_eq!(
            url,
            "https://1.2.3.4:32400/library/parts/1?download=1&X-Plex-Token=srvTok"
        );
    }

    #[test]
    fn test_part_download_url_encodes_token() {
        let url = part_download_url("https://1.2.3.4:32400", "/library/parts/1", "a b&c");
        assert_eq!(
            url,
            "https://1.2.3.4:32400/library/parts/1?download=1&X-Plex-Token=a%20b%26c"
        );
    }

    #[test]
    fn test_part_file_name() {
        assert_eq!(part_file_name("/library/parts/10/1498/file.mkv"), "file.mkv");
    }

    #[test]
    fn test_part_file_name_numeric_segment() {
        assert_eq!(part_file_name("/library/parts/1"), "1");
    }

    #[test]
    fn test_part_file_name_ignores_query() {
        assert_eq!(part_file_name("/library/parts/10/file.mkv?foo=bar"), "file.mkv");
    }

    #[test]
    fn test_part_file_name_strips_hostile_chars() {
        assert_eq!(part_file_name("/library/parts/10/a:b*c?.mkv"), "abc.mkv");
    }

    #[test]
    fn test_part_file_name_fallback() {
        assert_eq!(part_file_name(""), "download");
        assert_eq!(part_file_name("///"), "download");
    }

    #[test]
    fn test_unique_path_free_name() {
        let dir = TempDir::new().unwrap();
        let path = unique_path(dir.path(), "file.mkv");
        assert_eq!(path, dir.path().join("file.mkv"));
    }

    #[test]
    fn test_unique_path_counts_up() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("file.mkv"), b"x").unwrap();
        std::fs::write(dir.path().join("file (1).mkv"), b"x").unwrap();

        let path = unique_path(dir.path(), "file.mkv");
        assert_eq!(path, dir.path().join("file (2).mkv"));
    }

    #[test]
    fn test_unique_path_without_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("1"), b"x").unwrap();

        let path = unique_path(dir.path(), "1");
        assert_eq!(path, dir.path().join("1 (1)"));
    }
}
