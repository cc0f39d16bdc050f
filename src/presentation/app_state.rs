// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::streaming_service::StreamingDashboardService;
use crate::infrastructure::board_store::BoardStore;
use crate::infrastructure::config::EmbedSettings;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub streaming_service: StreamingDashboardService,
    pub board_store: BoardStore,
    pub embed: EmbedSettings,
}

impl AppState {
    pub fn secret_key(&self) -> Option<&[u8]> {
        self.embed
            .secret_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(str::as_bytes)
    }
}
