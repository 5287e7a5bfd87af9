//! Loading the token model from external files.
//!
//! Fetching and decoding are split: a [`ModelSource`](loader::ModelSource)
//! delivers raw bytes through a oneshot channel, the engine polls the pending
//! [`LoadAttempt`](loader::LoadAttempt) once per frame, and
//! [`decode_model`](model::decode_model) turns the bytes into mesh data.
//! [`AssetSource`] is the stock source: files under `./assets` natively and the
//! page's `/assets` directory on the web.

use futures::channel::oneshot;

use crate::resources::loader::{FetchReceiver, ModelSource};

pub mod loader;
pub mod model;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no browser window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin unavailable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(
    #[cfg(not(target_arch = "wasm32"))] root: &std::path::Path,
    file_name: &str,
) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = tokio::fs::read(root.join(file_name)).await?;

    Ok(data)
}

/// Reads model files asynchronously: on a tokio runtime natively, on the
/// browser's event loop on the web.
#[derive(Clone, Debug)]
pub struct AssetSource {
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Handle,
    #[cfg(not(target_arch = "wasm32"))]
    root: std::path::PathBuf,
}

impl AssetSource {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self {
            runtime,
            root: std::path::PathBuf::from("./assets"),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn new() -> Self {
        Self {}
    }

    /// Resolves references against `root` instead of `./assets`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_root(mut self, root: impl Into<std::path::PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}

impl ModelSource for AssetSource {
    fn fetch(&self, reference: &str) -> FetchReceiver {
        let (sender, receiver) = oneshot::channel();
        let reference = reference.to_string();
        #[cfg(not(target_arch = "wasm32"))]
        {
            let root = self.root.clone();
            self.runtime.spawn(async move {
                let result = load_binary(&root, &reference).await;
                // the receiver is gone once the attempt resolved or the engine unmounted
                if sender.send(result).is_err() {
                    log::debug!("model fetch for {} finished after its attempt resolved", reference);
                }
            });
        }
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move {
            let result = load_binary(&reference).await;
            if sender.send(result).is_err() {
                log::debug!("model fetch for {} finished after its attempt resolved", reference);
            }
        });
        receiver
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn should_report_missing_file_through_channel() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let source = AssetSource::new(runtime.handle().clone())
            .with_root(std::env::temp_dir().join("step-ngin-no-such-dir"));
        let receiver = source.fetch("missing.glb");
        let result = runtime.block_on(receiver).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn should_read_file_under_root() {
        let dir = std::env::temp_dir().join(format!("step-ngin-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("token.glb"), b"glTF").unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let source = AssetSource::new(runtime.handle().clone()).with_root(&dir);
        let bytes = runtime.block_on(source.fetch("token.glb")).unwrap().unwrap();
        assert_eq!(bytes, b"glTF");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
