// Repository trait for dashboard definitions
use crate::domain::dashboard::{Dashboard, EmbedType};
use async_trait::async_trait;
use serde::Serialize;

/// Catalog listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub embed_type: EmbedType,
    pub tab_count: usize,
    pub parameter_count: usize,
}

impl From<&Dashboard> for DashboardSummary {
    fn from(dashboard: &Dashboard) -> Self {
        Self {
            id: dashboard.id.clone(),
            title: dashboard.title.clone(),
            description: dashboard.description.clone(),
            embed_type: dashboard.embed_type,
            tab_count: dashboard.tabs.len(),
            parameter_count: dashboard.parameters.len(),
        }
    }
}

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn list_dashboards(&self) -> anyhow::Result<Vec<DashboardSummary>>;

    /// `Ok(None)` when no dashboard has this id.
    async fn find_dashboard(&self, id: &str) -> anyhow::Result<Option<Dashboard>>;
}
