// Dashboard session - one mounted dashboard with its parameter values, active tab and events
use super::events::{EventBus, Subscription};
use super::layout::{GridItem, auto_organize};
use super::resolution::{effective_values, is_editable, is_visible, values_from_query};
use crate::domain::card::GridRect;
use crate::domain::dashboard::{Dashboard, DashboardTab, EmbedConfig, EmbedConfigPatch, EmbedType};
use crate::domain::event::{DashboardEvent, FilterChange, FrameMessage};
use crate::domain::parameter::{Parameter, ParameterValues};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How long a refresh keeps the loading flag raised.
    pub refresh_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            refresh_delay: DEFAULT_REFRESH_DELAY,
        }
    }
}

/// Result of a parameter write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The parameter is locked by its definition or by the embed host.
    Rejected,
    /// No parameter with that id.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub can_edit: bool,
    pub can_drill_through: bool,
    pub can_export: bool,
}

#[derive(Debug, Default)]
struct RefreshState {
    loading: bool,
    generation: u64,
}

pub struct DashboardSession {
    dashboard: Dashboard,
    raw: ParameterValues,
    embed_config: EmbedConfig,
    is_embedded: bool,
    active_tab_id: Option<String>,
    events: EventBus,
    refresh: Arc<Mutex<RefreshState>>,
    refresh_task: Option<JoinHandle<()>>,
    options: SessionOptions,
}

impl DashboardSession {
    pub fn new(
        dashboard: Dashboard,
        initial_values: ParameterValues,
        embed_patch: Option<EmbedConfigPatch>,
        options: SessionOptions,
    ) -> Self {
        let is_embedded = embed_patch.is_some();
        let embed_config = match &embed_patch {
            Some(patch) => dashboard.embed_config.merged(patch),
            None => dashboard.embed_config.clone(),
        };
        let active_tab_id = dashboard.tabs.first().map(|t| t.id.clone());
        debug!(
            dashboard_id = %dashboard.id,
            embed_type = %dashboard.embed_type,
            is_embedded,
            "session created"
        );
        Self {
            dashboard,
            raw: initial_values,
            embed_config,
            is_embedded,
            active_tab_id,
            events: EventBus::new(),
            refresh: Arc::new(Mutex::new(RefreshState::default())),
            refresh_task: None,
            options,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn embed_config(&self) -> &EmbedConfig {
        &self.embed_config
    }

    pub fn embed_type(&self) -> EmbedType {
        self.dashboard.embed_type
    }

    pub fn is_embedded(&self) -> bool {
        self.is_embedded
    }

    /// User and URL supplied values, before defaults and locks.
    pub fn raw_parameters(&self) -> &ParameterValues {
        &self.raw
    }

    pub fn effective_parameters(&self) -> ParameterValues {
        effective_values(&self.dashboard.parameters, &self.raw, &self.embed_config)
    }

    pub fn set_parameter(&mut self, id: &str, value: Value) -> WriteOutcome {
        let Some(parameter) = self.dashboard.parameter(id) else {
            debug!(param_id = id, "ignoring write to unknown parameter");
            return WriteOutcome::Unknown;
        };
        if !is_editable(parameter, &self.embed_config) {
            warn!(param_id = id, "parameter is locked and cannot be changed");
            return WriteOutcome::Rejected;
        }

        self.raw.insert(id.to_string(), value.clone());
        self.events.emit(&DashboardEvent::FilterChange(FilterChange::Single {
            param_id: id.to_string(),
            value,
            all_params: self.raw.clone(),
        }));
        WriteOutcome::Applied
    }

    /// Apply several writes and emit a single batched change. Per-key outcomes are returned in key order.
    pub fn set_parameters(&mut self, values: ParameterValues) -> Vec<(String, WriteOutcome)> {
        let mut outcomes = Vec::with_capacity(values.len());
        for (id, value) in values {
            let outcome = match self.dashboard.parameter(&id) {
                None => WriteOutcome::Unknown,
                Some(parameter) if !is_editable(parameter, &self.embed_config) => {
                    warn!(param_id = %id, "parameter is locked and cannot be changed");
                    WriteOutcome::Rejected
                }
                Some(_) => {
                    self.raw.insert(id.clone(), value);
                    WriteOutcome::Applied
                }
            };
            outcomes.push((id, outcome));
        }

        self.events.emit(&DashboardEvent::FilterChange(FilterChange::Batch {
            params: self.raw.clone(),
        }));
        outcomes
    }

    /// Merge values decoded from a URL query (`<slug>` or `param_<slug>`). No events are emitted.
    pub fn apply_url_query<'a, I>(&mut self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let values = values_from_query(&self.dashboard.parameters, pairs);
        let count = values.len();
        self.raw.extend(values);
        count
    }

    pub fn active_tab(&self) -> Option<&DashboardTab> {
        self.active_tab_id
            .as_deref()
            .and_then(|id| self.dashboard.tab(id))
    }

    pub fn change_tab(&mut self, tab_id: &str) -> bool {
        let Some(tab) = self.dashboard.tab(tab_id).filter(|t| t.visible) else {
            return false;
        };
        let event = DashboardEvent::TabChange {
            tab_id: tab.id.clone(),
            tab_name: tab.name.clone(),
        };
        self.active_tab_id = Some(tab_id.to_string());
        self.events.emit(&event);
        true
    }

    /// Raise the loading flag and schedule its release. A newer refresh supersedes a pending one.
    pub fn refresh_dashboard(&mut self) {
        let generation = {
            let mut state = self.refresh.lock();
            state.loading = true;
            state.generation += 1;
            state.generation
        };
        if let Some(pending) = self.refresh_task.take() {
            pending.abort();
        }

        self.events.emit(&DashboardEvent::Refresh {
            timestamp: Utc::now(),
        });

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; clearing loading flag immediately");
            self.refresh.lock().loading = false;
            return;
        };
        let state = Arc::clone(&self.refresh);
        let delay = self.options.refresh_delay;
        self.refresh_task = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = state.lock();
            if state.generation == generation {
                state.loading = false;
            }
        }));
    }

    /// Abort a pending refresh timer and clear the loading flag.
    pub fn cancel_refresh(&mut self) {
        if let Some(pending) = self.refresh_task.take() {
            pending.abort();
        }
        let mut state = self.refresh.lock();
        state.generation += 1;
        state.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.refresh.lock().loading
    }

    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DashboardEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler)
    }

    /// Record a non-filter interaction (card click, export) on the event stream.
    pub fn notify(&self, event: DashboardEvent) {
        self.events.emit(&event);
    }

    pub fn capabilities(&self) -> Capabilities {
        let embed_type = self.dashboard.embed_type;
        Capabilities {
            can_edit: embed_type == EmbedType::Interactive
                && self.embed_config.locked_parameters.is_empty(),
            can_drill_through: !matches!(embed_type, EmbedType::Public | EmbedType::Signed),
            can_export: self.embed_config.download_buttons,
        }
    }

    pub fn visible_parameters(&self) -> Vec<&Parameter> {
        self.dashboard
            .parameters
            .iter()
            .filter(|p| is_visible(p, &self.embed_config))
            .collect()
    }

    /// Repack the active tab's cards whose visibility condition currently holds.
    pub fn auto_organize_active_tab(&mut self) -> Vec<String> {
        let effective = self.effective_parameters();
        match self.active_tab_mut() {
            Some(tab) => auto_organize(&mut tab.cards, |card| card.is_visible(&effective)),
            None => Vec::new(),
        }
    }

    /// Copy rectangles reported by the grid widget onto the active tab's cards.
    pub fn apply_layout_change<I>(&mut self, layout: I) -> usize
    where
        I: IntoIterator<Item = (String, GridRect)>,
    {
        let Some(tab) = self.active_tab_mut() else {
            return 0;
        };
        let mut updated = 0;
        for (id, rect) in layout {
            if let Some(card) = tab.cards.iter_mut().find(|c| c.id == id) {
                card.set_rect(rect);
                updated += 1;
            }
        }
        updated
    }

    fn active_tab_mut(&mut self) -> Option<&mut DashboardTab> {
        let id = self.active_tab_id.as_deref()?;
        self.dashboard.tabs.iter_mut().find(|t| t.id == id)
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        if let Some(pending) = self.refresh_task.take() {
            pending.abort();
        }
    }
}

impl std::fmt::Debug for DashboardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardSession")
            .field("dashboard_id", &self.dashboard.id)
            .field("active_tab_id", &self.active_tab_id)
            .field("raw", &self.raw)
            .field("is_embedded", &self.is_embedded)
            .finish()
    }
}

/// Forward filter changes to the host page as `metabase:parameters:change` messages.
#[must_use = "dropping the subscription stops forwarding"]
pub fn frame_bridge(session: &DashboardSession, sender: UnboundedSender<FrameMessage>) -> Subscription {
    let dashboard_id = session.dashboard().id.clone();
    session.subscribe(move |event| {
        if let DashboardEvent::FilterChange(change) = event {
            let message = FrameMessage::parameters_changed(&dashboard_id, change.values().clone());
            if sender.send(message).is_err() {
                debug!(dashboard_id = %dashboard_id, "frame bridge receiver closed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{customer_insights, sales_analytics};
    use crate::domain::event::PARAMETERS_CHANGE_MESSAGE;
    use serde_json::json;

    fn session(dashboard: Dashboard) -> DashboardSession {
        DashboardSession::new(dashboard, ParameterValues::new(), None, SessionOptions::default())
    }

    fn recorder(session: &DashboardSession) -> (Arc<Mutex<Vec<DashboardEvent>>>, Subscription) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = session.subscribe(move |event| sink.lock().push(event.clone()));
        (events, subscription)
    }

    #[test]
    fn test_defaults_apply_until_overridden() {
        let mut session = session(sales_analytics());
        let effective = session.effective_parameters();
        assert_eq!(effective["region"], json!("North America"));
        assert_eq!(effective["date_range"], json!("last_30_days"));
        assert!(!effective.contains_key("min_revenue"));

        assert_eq!(session.set_parameter("region", json!("Europe")), WriteOutcome::Applied);
        assert_eq!(session.effective_parameters()["region"], json!("Europe"));
    }

    #[test]
    fn test_locked_parameter_write_is_rejected_without_event() {
        let mut session = session(customer_insights());
        let (events, _subscription) = recorder(&session);

        assert_eq!(session.set_parameter("company_id", json!("999")), WriteOutcome::Rejected);
        assert_eq!(session.effective_parameters()["company_id"], json!("12345"));
        assert!(session.raw_parameters().is_empty());
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_unknown_parameter_write_is_ignored() {
        let mut session = session(sales_analytics());
        assert_eq!(session.set_parameter("nope", json!(1)), WriteOutcome::Unknown);
        assert!(session.raw_parameters().is_empty());
    }

    #[test]
    fn test_filter_change_event_carries_all_raw_values() {
        let mut session = session(sales_analytics());
        let (events, _subscription) = recorder(&session);

        session.set_parameter("region", json!("Europe"));
        session.set_parameter("min_revenue", json!(5000));

        let events = events.lock();
        assert_eq!(events.len(), 2);
        match &events[1] {
            DashboardEvent::FilterChange(FilterChange::Single { param_id, value, all_params }) => {
                assert_eq!(param_id, "min_revenue");
                assert_eq!(value, &json!(5000));
                assert_eq!(all_params.len(), 2);
                assert_eq!(all_params["region"], json!("Europe"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_batched_write_gates_per_key_and_emits_once() {
        let mut session = session(customer_insights());
        let (events, _subscription) = recorder(&session);

        let mut batch = ParameterValues::new();
        batch.insert("company_id".to_string(), json!("1"));
        batch.insert("segment".to_string(), json!(["enterprise"]));
        batch.insert("ghost".to_string(), json!(true));
        let outcomes = session.set_parameters(batch);

        assert_eq!(
            outcomes,
            vec![
                ("company_id".to_string(), WriteOutcome::Rejected),
                ("ghost".to_string(), WriteOutcome::Unknown),
                ("segment".to_string(), WriteOutcome::Applied),
            ]
        );
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(
            serde_json::to_value(&events[0]).unwrap(),
            json!({"type": "filter_change", "payload": {"params": {"segment": ["enterprise"]}}})
        );
    }

    #[test]
    fn test_url_query_is_merged_silently() {
        let mut session = session(sales_analytics());
        let (events, _subscription) = recorder(&session);

        let applied = session.apply_url_query(vec![("param_min_revenue", "2500"), ("region", "Europe")]);
        assert_eq!(applied, 2);
        let effective = session.effective_parameters();
        assert_eq!(effective["min_revenue"], json!(2500.0));
        assert_eq!(effective["region"], json!("Europe"));
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_change_tab() {
        let mut dashboard = sales_analytics();
        dashboard.tabs[1].visible = false;
        let mut session = session(dashboard);
        let (events, _subscription) = recorder(&session);

        assert_eq!(session.active_tab().map(|t| t.id.as_str()), Some("overview"));
        assert!(!session.change_tab("details"));
        assert!(!session.change_tab("missing"));
        assert!(session.change_tab("overview"));

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            DashboardEvent::TabChange {
                tab_id: "overview".to_string(),
                tab_name: "Overview".to_string()
            }
        );
    }

    #[test]
    fn test_capabilities_follow_embed_type_and_config() {
        let public = session(sales_analytics());
        assert_eq!(
            public.capabilities(),
            Capabilities {
                can_edit: false,
                can_drill_through: false,
                can_export: true
            }
        );

        let signed = session(customer_insights());
        assert!(!signed.capabilities().can_export);

        let mut dashboard = sales_analytics();
        dashboard.embed_type = EmbedType::Interactive;
        let interactive = session(dashboard);
        assert!(interactive.capabilities().can_edit);
        assert!(interactive.capabilities().can_drill_through);

        let mut dashboard = customer_insights();
        dashboard.embed_type = EmbedType::Interactive;
        assert!(!session(dashboard).capabilities().can_edit);
    }

    #[test]
    fn test_embed_patch_marks_session_embedded() {
        let patch = EmbedConfigPatch {
            hide_parameters: Some(true),
            download_buttons: Some(false),
            ..EmbedConfigPatch::default()
        };
        let session = DashboardSession::new(
            sales_analytics(),
            ParameterValues::new(),
            Some(patch),
            SessionOptions::default(),
        );
        assert!(session.is_embedded());
        assert!(session.visible_parameters().is_empty());
        assert!(!session.capabilities().can_export);
    }

    #[test]
    fn test_hidden_parameters_are_not_visible() {
        let session = session(customer_insights());
        let visible: Vec<&str> = session.visible_parameters().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(visible, vec!["segment"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_clears_loading_after_delay() {
        let mut session = session(sales_analytics());
        let (events, _subscription) = recorder(&session);

        session.refresh_dashboard();
        assert!(session.is_loading());
        assert_eq!(events.lock()[0].kind(), "refresh");

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(session.is_loading());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_refresh_restarts_the_timer() {
        let mut session = session(sales_analytics());
        session.refresh_dashboard();
        tokio::time::sleep(Duration::from_millis(600)).await;
        session.refresh_dashboard();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(session.is_loading());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_refresh() {
        let mut session = session(sales_analytics());
        session.refresh_dashboard();
        session.cancel_refresh();
        assert!(!session.is_loading());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_frame_bridge_forwards_filter_changes() {
        let mut session = session(sales_analytics());
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let bridge = frame_bridge(&session, sender);

        session.set_parameter("region", json!("Asia Pacific"));
        session.change_tab("details");

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.kind, PARAMETERS_CHANGE_MESSAGE);
        assert_eq!(message.dashboard_id, "sales-analytics");
        assert_eq!(message.parameters["region"], json!("Asia Pacific"));
        assert!(receiver.try_recv().is_err());

        drop(bridge);
        session.set_parameter("region", json!("Europe"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_auto_organize_active_tab_skips_hidden_cards() {
        let mut session = session(sales_analytics());
        session.change_tab("details");
        session.set_parameter("region", json!("Latin America"));
        session.apply_layout_change(vec![("regional-map".to_string(), GridRect::new(4, 40, 18, 6))]);

        let moved = session.auto_organize_active_tab();
        assert_eq!(moved.len(), 2);
        assert!(!moved.contains(&"regional-map".to_string()));
        let map = session.dashboard().card("regional-map").unwrap();
        assert_eq!(map.grid_position.rect(), GridRect::new(4, 40, 18, 6));
    }
}
