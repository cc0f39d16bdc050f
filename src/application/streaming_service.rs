// Streaming dashboard service - Progressive rendering as skeleton, card and completion messages
use crate::application::render::{render_card, render_dashboard, RenderedCard, TabView};
use crate::application::session::DashboardSession;
use crate::domain::card::GridPosition;
use crate::domain::dashboard::EmbedType;
use serde::Serialize;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSlot {
    pub id: String,
    pub position: GridPosition,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSkeleton {
    pub dashboard_id: String,
    pub title: String,
    pub embed_type: EmbedType,
    pub tabs: Vec<TabView>,
    pub cards: Vec<CardSlot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Skeleton(DashboardSkeleton),
    Card { card: RenderedCard },
    #[serde(rename_all = "camelCase")]
    Complete { card_count: usize, duration_ms: u64 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingDashboardService;

impl StreamingDashboardService {
    pub fn new() -> Self {
        Self
    }

    /// Send the skeleton right away, then one message per visible card of the active tab as each
    /// render task finishes, then a completion event once every task is done.
    pub fn stream_dashboard(&self, session: &DashboardSession) -> mpsc::Receiver<StreamMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let start_time = Instant::now();

        let view = render_dashboard(session);
        let effective = session.effective_parameters();
        let capabilities = session.capabilities();
        let parameters = session.dashboard().parameters.clone();
        let cards: Vec<_> = session
            .active_tab()
            .map(|tab| {
                tab.cards
                    .iter()
                    .filter(|card| card.is_visible(&effective))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let skeleton = DashboardSkeleton {
            dashboard_id: view.id.clone(),
            title: view.title.clone(),
            embed_type: view.embed_type,
            tabs: view.tabs,
            cards: cards
                .iter()
                .map(|card| CardSlot {
                    id: card.id.clone(),
                    position: card.grid_position.clone(),
                })
                .collect(),
        };
        let card_count = cards.len();
        tracing::debug!(dashboard_id = %view.id, card_count, "streaming dashboard");

        tokio::spawn(async move {
            if tx.send(StreamMessage::Skeleton(skeleton)).await.is_err() {
                return;
            }

            let mut tasks = JoinSet::new();
            for card in cards {
                let tx = tx.clone();
                let parameters = parameters.clone();
                let effective = effective.clone();
                tasks.spawn(async move {
                    let rendered = render_card(&card, &parameters, &effective, &capabilities);
                    let _ = tx.send(StreamMessage::Card { card: rendered }).await;
                });
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "card render task failed");
                }
            }

            let duration_ms = start_time.elapsed().as_millis() as u64;
            let _ = tx.send(StreamMessage::Complete { card_count, duration_ms }).await;
        });

        rx
    }
}
