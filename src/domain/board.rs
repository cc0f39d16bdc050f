// Builder board model: the standalone editor's cards, filters and tabs
use super::card::GridRect;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Area,
    Scatter,
    Pie,
    Donut,
    Number,
    Trend,
    Table,
    Pivot,
    Funnel,
    Progress,
    Gauge,
    Text,
    Filter,
    Map,
}

impl ChartKind {
    pub const ALL: [ChartKind; 16] = [
        ChartKind::Line,
        ChartKind::Bar,
        ChartKind::Area,
        ChartKind::Scatter,
        ChartKind::Pie,
        ChartKind::Donut,
        ChartKind::Number,
        ChartKind::Trend,
        ChartKind::Table,
        ChartKind::Pivot,
        ChartKind::Funnel,
        ChartKind::Progress,
        ChartKind::Gauge,
        ChartKind::Text,
        ChartKind::Filter,
        ChartKind::Map,
    ];

    pub fn default_title(self) -> &'static str {
        match self {
            ChartKind::Line => "Revenue Trend",
            ChartKind::Bar => "Sales by Category",
            ChartKind::Area => "Traffic Sources",
            ChartKind::Scatter => "Price vs Performance",
            ChartKind::Pie => "Market Share",
            ChartKind::Donut => "User Demographics",
            ChartKind::Number => "Total Revenue",
            ChartKind::Trend => "Growth Rate",
            ChartKind::Table => "Recent Transactions",
            ChartKind::Pivot => "Sales by Region",
            ChartKind::Funnel => "Conversion Funnel",
            ChartKind::Progress => "Goal Progress",
            ChartKind::Gauge => "Performance Score",
            ChartKind::Text => "Key Insights",
            ChartKind::Filter => "Date Range",
            ChartKind::Map => "Sales by Location",
        }
    }

    /// Default `(w, h)` in grid units.
    pub fn default_size(self) -> (u32, u32) {
        match self {
            ChartKind::Line | ChartKind::Area => (8, 5),
            ChartKind::Bar | ChartKind::Scatter | ChartKind::Pivot => (6, 5),
            ChartKind::Pie | ChartKind::Donut | ChartKind::Funnel => (4, 5),
            ChartKind::Number | ChartKind::Trend | ChartKind::Gauge => (3, 3),
            ChartKind::Table => (8, 6),
            ChartKind::Progress | ChartKind::Filter => (3, 2),
            ChartKind::Text => (4, 3),
            ChartKind::Map => (6, 6),
        }
    }
}

/// Filter builder settings attached to a filter card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub widget: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_select: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl FilterConfig {
    /// Widget preselected by the filter builder when the type changes.
    pub fn default_widget_for(kind: &str) -> &'static str {
        match kind {
            "text" => "dropdown",
            "number" => "between",
            "location" => "state",
            "boolean" => "checkbox",
            "id" => "input",
            _ => "date-range",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCard {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_config: Option<FilterConfig>,
    /// Owning tab; `None` shows the card on every tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
}

impl BoardCard {
    pub fn new(id: &str, kind: ChartKind, title: &str, rect: GridRect) -> Self {
        Self {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            filter_config: None,
            tab_id: None,
        }
    }

    pub fn on_tab(mut self, tab: &str) -> Self {
        self.tab_id = Some(tab.to_string());
        self
    }

    pub fn rect(&self) -> GridRect {
        GridRect::new(self.x, self.y, self.w, self.h)
    }

    pub fn belongs_to(&self, tab: &str) -> bool {
        self.tab_id.as_deref().is_none_or(|owner| owner == tab)
    }
}

/// Persisted builder layout: `{name, tabs, cards, filters}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub name: String,
    pub tabs: Vec<String>,
    pub cards: Vec<BoardCard>,
    #[serde(default)]
    pub filters: Vec<BoardCard>,
}

impl Board {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tabs: vec![
                "Overview".to_string(),
                "Details".to_string(),
                "Analysis".to_string(),
            ],
            cards: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn filters_on(&self, tab: &str) -> impl Iterator<Item = &BoardCard> {
        self.filters.iter().filter(move |f| f.belongs_to(tab))
    }

    /// First card or filter whose position or height exceeds [`MAX_GRID_EXTENT`].
    pub fn oversized_item(&self) -> Option<&BoardCard> {
        self.cards
            .iter()
            .chain(&self.filters)
            .find(|c| c.x > MAX_GRID_EXTENT || c.y > MAX_GRID_EXTENT || c.h > MAX_GRID_EXTENT)
    }
}

/// Largest coordinate or height accepted from a saved board, in grid units.
pub const MAX_GRID_EXTENT: u32 = 10_000;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_kind_fits_the_grid() {
        for kind in ChartKind::ALL {
            let (w, h) = kind.default_size();
            assert!(w <= 18 && w > 0 && h > 0, "{kind:?}");
            assert!(!kind.default_title().is_empty());
        }
    }

    #[test]
    fn test_board_card_persisted_shape() {
        let card = BoardCard::new("card-1", ChartKind::Line, "Revenue Trend", GridRect::new(0, 0, 8, 5));
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(
            value,
            json!({"id": "card-1", "type": "line", "title": "Revenue Trend", "x": 0, "y": 0, "w": 8, "h": 5})
        );
    }

    #[test]
    fn test_untagged_card_belongs_to_every_tab() {
        let shared = BoardCard::new("card-1", ChartKind::Bar, "Sales", GridRect::new(0, 0, 6, 5));
        let owned = shared.clone().on_tab("Financials");
        assert!(shared.belongs_to("Overview"));
        assert!(owned.belongs_to("Financials"));
        assert!(!owned.belongs_to("Overview"));
    }

    #[test]
    fn test_oversized_item_is_reported() {
        let mut board = Board::new("Weekly");
        board.cards.push(BoardCard::new("card-1", ChartKind::Bar, "Sales", GridRect::new(0, 0, 6, 5)));
        assert!(board.oversized_item().is_none());

        board.filters.push(BoardCard::new(
            "filter-1",
            ChartKind::Filter,
            "Date Range",
            GridRect::new(0, 0, 3, 300_000_000),
        ));
        assert_eq!(board.oversized_item().map(|c| c.id.as_str()), Some("filter-1"));
    }
}
