// JSON catalog of dashboard definitions
use crate::application::dashboard_repository::{DashboardRepository, DashboardSummary};
use crate::domain::dashboard::Dashboard;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read dashboard catalog {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dashboard catalog {path} is malformed")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("dashboard id {0:?} appears more than once")]
    DuplicateId(String),
}

/// Dashboards loaded once from a JSON array and served from memory.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    dashboards: Vec<Dashboard>,
}

impl CatalogRepository {
    pub fn new(dashboards: Vec<Dashboard>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for dashboard in &dashboards {
            if !seen.insert(dashboard.id.as_str()) {
                return Err(CatalogError::DuplicateId(dashboard.id.clone()));
            }
        }
        Ok(Self { dashboards })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let dashboards: Vec<Dashboard> =
            serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), count = dashboards.len(), "loaded dashboard catalog");
        Self::new(dashboards)
    }
}

#[async_trait]
impl DashboardRepository for CatalogRepository {
    async fn list_dashboards(&self) -> anyhow::Result<Vec<DashboardSummary>> {
        Ok(self.dashboards.iter().map(DashboardSummary::from).collect())
    }

    async fn find_dashboard(&self, id: &str) -> anyhow::Result<Option<Dashboard>> {
        Ok(self.dashboards.iter().find(|d| d.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures;

    #[tokio::test]
    async fn test_load_bundled_catalog() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/dashboards.json");
        let repository = CatalogRepository::load(path).await.unwrap();

        let summaries = repository.list_dashboards().await.unwrap();
        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["sales-analytics", "customer-insights"]);
        assert_eq!(summaries[0].tab_count, 2);
        assert_eq!(summaries[1].parameter_count, 2);

        let found = repository.find_dashboard("customer-insights").await.unwrap();
        assert_eq!(found.map(|d| d.title), Some("Customer Insights Dashboard".to_string()));
        assert!(repository.find_dashboard("missing").await.unwrap().is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let twice = vec![fixtures::sales_analytics(), fixtures::sales_analytics()];
        assert!(matches!(
            CatalogRepository::new(twice),
            Err(CatalogError::DuplicateId(id)) if id == "sales-analytics"
        ));
    }

    #[tokio::test]
    async fn test_malformed_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{\"not\": \"a list\"}").unwrap();

        assert!(matches!(CatalogRepository::load(&bad).await, Err(CatalogError::Parse { .. })));
        assert!(matches!(
            CatalogRepository::load(dir.path().join("absent.json")).await,
            Err(CatalogError::Read { .. })
        ));
    }
}
