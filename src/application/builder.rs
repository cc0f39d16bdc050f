// Builder board editor - card/filter editing, tabs and layout commands on a Board
use super::layout::{
    GRID_COLUMNS, GridItem, apply_template, auto_organize, clamp_width, filter_row_layout,
    place_new,
};
use super::templates::home_services_template;
use crate::domain::board::{Board, BoardCard, ChartKind, FilterConfig};
use crate::domain::card::GridRect;
use chrono::Utc;
use tracing::{debug, info};

/// Horizontal padding around the grid container, in pixels.
pub const CONTAINER_PADDING_PX: u32 = 48;

/// Pixel height of one grid row.
pub const ROW_HEIGHT_PX: u32 = 50;

const DEFAULT_CONTAINER_WIDTH_PX: u32 = 1200;

/// Filters created through the filter builder are wider than the `filter` chart default.
const BUILT_FILTER_SIZE: (u32, u32) = (4, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardMetrics {
    pub width_px: f64,
    pub height_px: u32,
    pub size_class: SizeClass,
}

/// Pixel size and size class of a card for a given container width.
pub fn card_metrics(container_width: u32, card: &BoardCard) -> CardMetrics {
    let size_class = if card.w < 4 || card.h < 3 {
        SizeClass::Small
    } else if card.w < 6 || card.h < 4 {
        SizeClass::Medium
    } else {
        SizeClass::Large
    };
    CardMetrics {
        width_px: f64::from(container_width) / f64::from(GRID_COLUMNS) * f64::from(card.w),
        height_px: ROW_HEIGHT_PX * card.h,
        size_class,
    }
}

/// Editing state of the standalone builder.
#[derive(Debug, Clone)]
pub struct BoardEditor {
    board: Board,
    active_tab: String,
    container_width: u32,
    from_template: bool,
}

impl BoardEditor {
    pub fn new(name: &str) -> Self {
        Self::from_board(Board::new(name))
    }

    /// Wrap a saved board. Boards named after the Home Services template keep its layout.
    pub fn from_board(board: Board) -> Self {
        let active_tab = board.tabs.first().cloned().unwrap_or_default();
        let from_template = board.name.contains("Home Services");
        Self {
            board,
            active_tab,
            container_width: DEFAULT_CONTAINER_WIDTH_PX,
            from_template,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn active_tab(&self) -> &str {
        &self.active_tab
    }

    pub fn container_width(&self) -> u32 {
        self.container_width
    }

    /// Cards shown on the active tab.
    pub fn visible_cards(&self) -> Vec<&BoardCard> {
        self.board
            .cards
            .iter()
            .filter(|card| card.belongs_to(&self.active_tab))
            .collect()
    }

    /// Append a chart card with its kind's default title and size.
    pub fn add_card(&mut self, kind: ChartKind) -> String {
        if kind == ChartKind::Filter {
            let (w, h) = kind.default_size();
            return self.push_filter(kind.default_title(), w, h, None);
        }

        let (w, h) = kind.default_size();
        let w = clamp_width(w);
        let (x, y) = place_new(self.visible_cards().into_iter().map(BoardCard::rect), w);
        let id = self.fresh_id("card");
        let mut card = BoardCard::new(&id, kind, kind.default_title(), GridRect::new(x, y, w, h));
        if self.from_template {
            card = card.on_tab(&self.active_tab);
        }
        debug!(card_id = %id, kind = ?kind, x, y, "added card");
        self.board.cards.push(card);
        id
    }

    /// Append a configured filter to the active tab's filter row.
    pub fn add_filter(&mut self, config: FilterConfig) -> Option<String> {
        if config.name.trim().is_empty() {
            return None;
        }
        let (w, h) = BUILT_FILTER_SIZE;
        let title = config.name.clone();
        Some(self.push_filter(&title, w, h, Some(config)))
    }

    fn push_filter(&mut self, title: &str, w: u32, h: u32, config: Option<FilterConfig>) -> String {
        let widths: Vec<u32> = self
            .board
            .filters_on(&self.active_tab)
            .map(|f| f.w)
            .chain(std::iter::once(w))
            .collect();
        let (x, y) = filter_row_layout(widths).pop().unwrap_or((0, 0));

        let id = self.fresh_id(&format!("filter-{}", self.active_tab));
        let mut filter = BoardCard::new(&id, ChartKind::Filter, title, GridRect::new(x, y, clamp_width(w), h))
            .on_tab(&self.active_tab);
        filter.filter_config = config;
        debug!(filter_id = %id, x, y, "added filter");
        self.board.filters.push(filter);
        id
    }

    pub fn remove_card(&mut self, id: &str) -> bool {
        let before = self.board.cards.len();
        self.board.cards.retain(|c| c.id != id);
        before != self.board.cards.len()
    }

    pub fn remove_filter(&mut self, id: &str) -> bool {
        let before = self.board.filters.len();
        self.board.filters.retain(|f| f.id != id);
        before != self.board.filters.len()
    }

    pub fn rename_card(&mut self, id: &str, title: &str) -> bool {
        match self.board.cards.iter_mut().find(|c| c.id == id) {
            Some(card) => {
                card.title = title.to_string();
                true
            }
            None => false,
        }
    }

    /// Renames the filter and its builder config together.
    pub fn rename_filter(&mut self, id: &str, title: &str) -> bool {
        match self.board.filters.iter_mut().find(|f| f.id == id) {
            Some(filter) => {
                filter.title = title.to_string();
                if let Some(config) = filter.filter_config.as_mut() {
                    config.name = title.to_string();
                }
                true
            }
            None => false,
        }
    }

    /// Copy rectangles reported by the grid widget onto matching cards and filters.
    pub fn apply_layout_change<I>(&mut self, layout: I) -> usize
    where
        I: IntoIterator<Item = (String, GridRect)>,
    {
        let mut updated = 0;
        for (id, rect) in layout {
            let target = self
                .board
                .cards
                .iter_mut()
                .chain(self.board.filters.iter_mut())
                .find(|c| c.id == id);
            if let Some(card) = target {
                card.set_rect(rect);
                updated += 1;
            }
        }
        updated
    }

    /// Reset the active tab: template positions for template boards, greedy packing otherwise.
    pub fn auto_organize(&mut self) -> Vec<String> {
        let tab = self.active_tab.clone();
        let moved = if self.from_template {
            let template = home_services_template(0);
            apply_template(&mut self.board.cards, &template.cards, |card| card.belongs_to(&tab))
        } else {
            auto_organize(&mut self.board.cards, |card| card.belongs_to(&tab))
        };
        info!(tab = %tab, moved = moved.len(), "organized board");
        moved
    }

    /// Replace the board with the Home Services template.
    pub fn load_template(&mut self) {
        self.board = home_services_template(Utc::now().timestamp_millis());
        self.active_tab = self.board.tabs.first().cloned().unwrap_or_default();
        self.from_template = true;
        info!(cards = self.board.cards.len(), "loaded Home Services template");
    }

    pub fn add_tab(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.board.tabs.iter().any(|t| t == name) {
            return false;
        }
        self.board.tabs.push(name.to_string());
        true
    }

    pub fn set_active_tab(&mut self, name: &str) -> bool {
        if !self.board.tabs.iter().any(|t| t == name) {
            return false;
        }
        self.active_tab = name.to_string();
        true
    }

    /// Active tab filters with their wrapped positions.
    pub fn filter_layout(&self) -> Vec<(&BoardCard, (u32, u32))> {
        let filters: Vec<&BoardCard> = self.board.filters_on(&self.active_tab).collect();
        let positions = filter_row_layout(filters.iter().map(|f| f.w));
        filters.into_iter().zip(positions).collect()
    }

    pub fn set_window_width(&mut self, window_width: u32) {
        self.container_width = window_width.saturating_sub(CONTAINER_PADDING_PX);
    }

    pub fn card_metrics(&self, card: &BoardCard) -> CardMetrics {
        card_metrics(self.container_width, card)
    }

    /// `<prefix>-<millis>`, bumped until no card or filter uses it.
    fn fresh_id(&self, prefix: &str) -> String {
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let id = format!("{prefix}-{stamp}");
            let taken = self
                .board
                .cards
                .iter()
                .chain(self.board.filters.iter())
                .any(|c| c.id == id);
            if !taken {
                return id;
            }
            stamp += 1;
        }
    }
}
