// Dashboard service - Use case for loading dashboards and opening embed sessions
use crate::application::dashboard_repository::{DashboardRepository, DashboardSummary};
use crate::application::session::{DashboardSession, SessionOptions};
use crate::domain::dashboard::{Dashboard, EmbedType};
use crate::domain::parameter::ParameterValues;
use crate::infrastructure::embed_codec::parse_embed_pairs;
use crate::infrastructure::signed_token::SignedClaims;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LOAD_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(Dashboard),
    NotFound,
}

/// Everything an embed request carries besides the dashboard id.
#[derive(Debug, Clone, Copy)]
pub struct EmbedRequest<'a> {
    pub embed_type: EmbedType,
    pub query: &'a [(String, String)],
    /// Verified token claims for `signed` embeds.
    pub claims: Option<&'a SignedClaims>,
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn DashboardRepository>,
    load_delay: Duration,
    session_options: SessionOptions,
}

impl DashboardService {
    pub fn new(
        repository: Arc<dyn DashboardRepository>,
        load_delay: Duration,
        session_options: SessionOptions,
    ) -> Self {
        Self {
            repository,
            load_delay,
            session_options,
        }
    }

    pub async fn list_dashboards(&self) -> anyhow::Result<Vec<DashboardSummary>> {
        self.repository.list_dashboards().await
    }

    /// Fetch a dashboard after the simulated load delay. The requested embed type wins over the stored one.
    pub async fn load(&self, id: &str, embed_type: Option<EmbedType>) -> anyhow::Result<LoadOutcome> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        let Some(mut dashboard) = self.repository.find_dashboard(id).await? else {
            tracing::info!(dashboard_id = id, "dashboard not found");
            return Ok(LoadOutcome::NotFound);
        };
        if let Some(embed_type) = embed_type {
            dashboard.embed_type = embed_type;
        }
        tracing::debug!(dashboard_id = id, embed_type = %dashboard.embed_type, "dashboard loaded");
        Ok(LoadOutcome::Loaded(dashboard))
    }

    /// Plain (non-embedded) session with URL values applied.
    pub async fn open(&self, id: &str, query: &[(String, String)]) -> anyhow::Result<Option<DashboardSession>> {
        let dashboard = match self.load(id, None).await? {
            LoadOutcome::Loaded(dashboard) => dashboard,
            LoadOutcome::NotFound => return Ok(None),
        };
        let mut session = DashboardSession::new(
            dashboard,
            ParameterValues::new(),
            None,
            self.session_options.clone(),
        );
        session.apply_url_query(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(Some(session))
    }

    /// Build a session the way an embed URL describes it: flags and `param_*` values from the
    /// query, locked and hidden parameters from verified claims.
    pub async fn open_embedded(
        &self,
        id: &str,
        request: EmbedRequest<'_>,
    ) -> anyhow::Result<Option<DashboardSession>> {
        let dashboard = match self.load(id, Some(request.embed_type)).await? {
            LoadOutcome::Loaded(dashboard) => dashboard,
            LoadOutcome::NotFound => return Ok(None),
        };

        let pairs = || request.query.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let mut patch = parse_embed_pairs(pairs()).embed_config;
        let mut initial = ParameterValues::new();
        if let Some(claims) = request.claims {
            if let Some(locked) = &claims.locked_params {
                patch.locked_parameters = Some(locked.clone());
            }
            if let Some(hidden) = &claims.hidden_params {
                patch.hidden_parameters = Some(hidden.clone());
            }
            initial.extend(
                claims
                    .params
                    .iter()
                    .filter(|(key, _)| dashboard.parameter(key).is_some())
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
        }

        let mut session =
            DashboardSession::new(dashboard, initial, Some(patch), self.session_options.clone());
        let applied = session.apply_url_query(pairs());
        tracing::debug!(dashboard_id = id, url_values = applied, "embedded session opened");
        Ok(Some(session))
    }
}
