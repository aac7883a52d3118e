//! UpstreamStore — serialized, atomic rewrites of the upstream file.
//!
//! Every update reads the whole file, replaces one block, writes the
//! result to a sibling temp file and renames it into place, then reloads
//! the proxy. A single mutex covers the whole sequence, so concurrent
//! updates for different groups never overwrite each other and a reload
//! never observes a half-written file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use alb_registry::{NodeEntry, is_valid_group_name, is_valid_host};

use crate::error::AdapterError;
use crate::normalize::{WeightedServer, normalize};
use crate::reload::Reloader;
use crate::upstream::UpstreamFile;

pub struct UpstreamStore {
    path: PathBuf,
    reloader: Arc<dyn Reloader>,
    write_lock: Mutex<()>,
}

impl UpstreamStore {
    pub fn new(path: impl Into<PathBuf>, reloader: Arc<dyn Reloader>) -> Self {
        Self {
            path: path.into(),
            reloader,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file contents. A missing file reads as empty.
    pub async fn contents(&self) -> Result<String, AdapterError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(AdapterError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub async fn read(&self) -> Result<UpstreamFile, AdapterError> {
        Ok(UpstreamFile::parse(&self.contents().await?))
    }

    /// Normalize `nodes`, rewrite the group's block, and reload the proxy.
    ///
    /// Returns the servers written, in block order.
    pub async fn update_group(
        &self,
        group: &str,
        nodes: &[NodeEntry],
    ) -> Result<Vec<WeightedServer>, AdapterError> {
        check_names(group, nodes)?;
        let servers = normalize(nodes);

        let _guard = self.write_lock.lock().await;
        let mut file = self.read().await?;
        file.replace(group, &servers);
        self.write_atomic(&file.render()).await?;
        debug!(group, servers = servers.len(), path = ?self.path, "upstream block rewritten");

        self.reloader.reload().await?;
        info!(group, servers = servers.len(), "upstream updated");
        Ok(servers)
    }

    async fn write_atomic(&self, contents: &str) -> Result<(), AdapterError> {
        let tmp = temp_path(&self.path);
        let write_err = |source| AdapterError::Write {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, contents).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)?;
        Ok(())
    }
}

/// Rejects names that would not survive a render and re-parse of the file.
fn check_names(group: &str, nodes: &[NodeEntry]) -> Result<(), AdapterError> {
    if !is_valid_group_name(group) {
        return Err(AdapterError::InvalidGroupName {
            group: group.to_string(),
        });
    }
    if let Some(node) = nodes.iter().find(|n| !is_valid_host(&n.host)) {
        return Err(AdapterError::InvalidHost {
            group: group.to_string(),
            host: node.host.clone(),
        });
    }
    Ok(())
}

/// `dir/.name.tmp` next to the target so the rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upstream.conf".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    #[derive(Default)]
    struct CountingReloader {
        reloads: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Reloader for CountingReloader {
        async fn reload(&self) -> Result<(), AdapterError> {
            self.reloads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AdapterError::Reload {
                    command: "test".to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    fn entry(host: &str, weight: f64) -> NodeEntry {
        NodeEntry {
            host: host.to_string(),
            port: 80,
            weight,
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> (Arc<UpstreamStore>, Arc<CountingReloader>) {
        let reloader = Arc::new(CountingReloader::default());
        let store = Arc::new(UpstreamStore::new(
            dir.path().join("upstream.conf"),
            reloader.clone(),
        ));
        (store, reloader)
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(&dir);
        assert_eq!(store.contents().await.unwrap(), "");
    }

    #[tokio::test]
    async fn update_writes_block_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let (store, reloader) = store_in(&dir);

        let servers = store
            .update_group("web", &[entry("10.0.0.2", 8.0), entry("10.0.0.1", 7.0)])
            .await
            .unwrap();
        assert_eq!(servers[0].address, "10.0.0.1:80");

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            contents,
            "upstream web {\n    server 10.0.0.1:80 weight=1;\n    server 10.0.0.2:80 weight=51;\n}\n"
        );
        assert_eq!(reloader.reloads.load(Ordering::SeqCst), 1);
        assert!(!temp_path(store.path()).exists());
    }

    #[tokio::test]
    async fn existing_content_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(&dir);
        std::fs::write(
            store.path(),
            "upstream api {\n    server 10.0.1.1:80 weight=1;\n}\n",
        )
        .unwrap();

        store.update_group("web", &[]).await.unwrap();

        let file = store.read().await.unwrap();
        assert_eq!(file.upstreams(), vec!["api", "web"]);
        assert_eq!(file.block("web").unwrap(), "upstream web {\n}\n");
    }

    #[tokio::test]
    async fn concurrent_updates_keep_every_group() {
        let dir = tempfile::tempdir().unwrap();
        let (store, reloader) = store_in(&dir);

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update_group(&format!("g{i}"), &[entry("10.0.0.1", 1.0)])
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let file = store.read().await.unwrap();
        assert_eq!(file.upstreams().len(), 10);
        assert_eq!(reloader.reloads.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn reload_failure_is_reported_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let reloader = Arc::new(CountingReloader {
            reloads: AtomicUsize::new(0),
            fail: true,
        });
        let store = UpstreamStore::new(dir.path().join("upstream.conf"), reloader);

        let err = store.update_group("web", &[]).await.unwrap_err();
        assert!(matches!(err, AdapterError::Reload { .. }));
        // The file was already rewritten.
        assert_eq!(store.read().await.unwrap().upstreams(), vec!["web"]);
    }

    #[test]
    fn temp_path_is_hidden_sibling() {
        let tmp = temp_path(Path::new("/etc/nginx/upstream.conf"));
        assert_eq!(tmp, PathBuf::from("/etc/nginx/.upstream.conf.tmp"));
    }

    #[tokio::test]
    async fn unparsable_names_leave_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (store, reloader) = store_in(&dir);
        store.update_group("web", &[entry("10.0.0.1", 1.0)]).await.unwrap();
        let before = store.contents().await.unwrap();

        let err = store
            .update_group("my group", &[entry("10.0.0.1", 1.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidGroupName { .. }));

        let err = store
            .update_group("web", &[entry("10.0.0.1:1; server evil", 1.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidHost { .. }));
        assert!(err.is_bad_input());

        assert_eq!(store.contents().await.unwrap(), before);
        assert_eq!(reloader.reloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_updates_keep_a_single_block() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(&dir);
        store
            .update_group("eu-west.web_1", &[entry("10.0.0.1", 1.0)])
            .await
            .unwrap();
        store
            .update_group("eu-west.web_1", &[entry("[::1]", 2.0)])
            .await
            .unwrap();

        let file = store.read().await.unwrap();
        assert_eq!(file.upstreams(), vec!["eu-west.web_1"]);
        assert_eq!(
            file.block("eu-west.web_1").unwrap(),
            "upstream eu-west.web_1 {\n    server [::1]:80 weight=1;\n}\n"
        );
    }
}
