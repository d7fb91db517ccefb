use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::SketchError;
use crate::settings::SketchSettings;

use super::{ReferenceImage, ReferenceResolver};

/// Where a reference URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    Http(String),
    File(PathBuf),
}

impl ReferenceSource {
    /// `http(s)://` goes to the network, `file://` and everything else is a path
    /// resolved against `base_dir`.
    pub fn parse(url: &str, base_dir: &Path) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Self::Http(url.to_string());
        }
        let path = url.strip_prefix("file://").unwrap_or(url);
        Self::File(base_dir.join(path))
    }
}

/// Resolver used outside tests: fetches over HTTP with `reqwest`, reads local files
/// with `tokio::fs`, and decodes with the `image` crate on a blocking thread.
#[derive(Debug, Clone)]
pub struct DefaultResolver {
    client: reqwest::Client,
    base_dir: PathBuf,
}

impl DefaultResolver {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, SketchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| SketchError::HttpClient {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_dir: base_dir.into(),
        })
    }

    pub fn from_settings(
        settings: &SketchSettings,
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self, SketchError> {
        Self::new(
            base_dir,
            Duration::from_secs(settings.fetch_timeout_secs),
            &settings.user_agent,
        )
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ReferenceResolver for DefaultResolver {
    fn resolve(&self, url: &str) -> BoxFuture<'static, Result<ReferenceImage, SketchError>> {
        let client = self.client.clone();
        let source = ReferenceSource::parse(url, &self.base_dir);
        let url = url.to_string();
        async move {
            let bytes = match source {
                ReferenceSource::Http(target) => fetch_http(&client, &target).await,
                ReferenceSource::File(path) => tokio::fs::read(&path).await.map_err(|e| {
                    SketchError::ReferenceDownloadFailed {
                        url: url.clone(),
                        message: format!("{}: {e}", path.display()),
                    }
                }),
            }?;
            decode(url, bytes).await
        }
        .boxed()
    }
}

async fn fetch_http(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, SketchError> {
    let failed = |message: String| SketchError::ReferenceDownloadFailed {
        url: url.to_string(),
        message,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| failed(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| failed(format!("reading body failed: {e}")))?;
    Ok(bytes.to_vec())
}

async fn decode(url: String, bytes: Vec<u8>) -> Result<ReferenceImage, SketchError> {
    let task_url = url.clone();
    tokio::task::spawn_blocking(move || {
        let pixels = image::load_from_memory(&bytes).map_err(|e| {
            SketchError::ReferenceDownloadFailed {
                url: url.clone(),
                message: format!("not a supported image: {e}"),
            }
        })?;
        Ok(ReferenceImage::from_dynamic(url, pixels))
    })
    .await
    .map_err(|e| SketchError::ReferenceDownloadFailed {
        url: task_url,
        message: format!("decode task failed: {e}"),
    })?
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sketchline_resolver_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::new_rgba8(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn classifies_sources() {
        let base = Path::new("/work");
        assert_eq!(
            ReferenceSource::parse("https://example.com/a.png", base),
            ReferenceSource::Http("https://example.com/a.png".into())
        );
        assert_eq!(
            ReferenceSource::parse("file:///tmp/a.png", base),
            ReferenceSource::File(PathBuf::from("/tmp/a.png"))
        );
        assert_eq!(
            ReferenceSource::parse("pics/a.png", base),
            ReferenceSource::File(PathBuf::from("/work/pics/a.png"))
        );
    }

    #[tokio::test]
    async fn loads_local_png() {
        let dir = temp_dir("png");
        std::fs::write(dir.join("pic.png"), png_bytes(12, 7)).unwrap();

        let resolver = DefaultResolver::new(&dir, Duration::from_secs(5), "sketchline-test").unwrap();
        let image = resolver.resolve("pic.png").await.unwrap();
        assert_eq!((image.width, image.height), (12, 7));
        assert_eq!(image.source, "pic.png");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn rejects_missing_and_undecodable_files() {
        let dir = temp_dir("bad");
        std::fs::write(dir.join("notes.txt"), b"not an image").unwrap();
        let resolver = DefaultResolver::new(&dir, Duration::from_secs(5), "sketchline-test").unwrap();

        let missing = resolver.resolve("absent.png").await.unwrap_err();
        assert!(matches!(missing, SketchError::ReferenceDownloadFailed { .. }));

        let garbage = resolver.resolve("notes.txt").await.unwrap_err();
        assert!(garbage.to_string().contains("not a supported image"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
