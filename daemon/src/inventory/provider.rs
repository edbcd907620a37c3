use anyhow::Context;
use log::debug;
use std::path::{Path, PathBuf};

use super::InstanceDescriptor;

/// Source of the instances to report on.
#[async_trait::async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn list_instances(&self) -> anyhow::Result<Vec<InstanceDescriptor>>;
}

/// Inventory kept in a JSON array on disk, re-read on every call so edits show up
/// on the next poll.
pub struct JsonFileInventory {
    path: PathBuf,
}

impl JsonFileInventory {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl InventoryProvider for JsonFileInventory {
    async fn list_instances(&self) -> anyhow::Result<Vec<InstanceDescriptor>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("inventory {} not found, no instances", self.path.display());
                return Ok(vec![]);
            }
            Err(e) => {
                return Err(e).context(format!("failed to read inventory {}", self.path.display()))
            }
        };
        serde_json::from_str(&content)
            .with_context(|| format!("malformed inventory {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn missing_file_is_empty_inventory() {
        let dir = tempfile::tempdir().unwrap();
        let inventory = JsonFileInventory::new(dir.path().join("inventory.json"));
        assert_eq!(inventory.list_instances().await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn reads_instances_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(
            &path,
            r#"[{"name": "b", "state": "running"}, {"name": "a", "state": "exited"}]"#,
        )
        .unwrap();

        let inventory = JsonFileInventory::new(&path);
        let names: Vec<_> = inventory
            .list_instances()
            .await
            .unwrap()
            .into_iter()
            .map(|instance| instance.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);

        std::fs::write(&path, r#"[{"name": "c", "state": "running"}]"#).unwrap();
        assert_eq!(inventory.list_instances().await.unwrap()[0].name, "c");
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(JsonFileInventory::new(&path).list_instances().await.is_err());
    }
}
