// Grid layout - placement of new cards, greedy auto-organize and filter row wrapping
use crate::domain::board::{BoardCard, ChartKind};
use crate::domain::card::{Card, GridRect};
use std::collections::BTreeMap;

/// Fixed grid width in columns.
pub const GRID_COLUMNS: u32 = 18;

/// Height of one wrapped filter row, in grid units.
pub const FILTER_ROW_HEIGHT: u32 = 2;

/// Anything positioned on the grid.
pub trait GridItem {
    fn item_id(&self) -> &str;
    fn rect(&self) -> GridRect;
    fn set_rect(&mut self, rect: GridRect);

    /// Filters are laid out separately and skipped by auto-organize.
    fn is_filter(&self) -> bool {
        false
    }
}

impl GridItem for BoardCard {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn rect(&self) -> GridRect {
        BoardCard::rect(self)
    }

    fn set_rect(&mut self, rect: GridRect) {
        self.x = rect.x;
        self.y = rect.y;
        self.w = rect.w;
        self.h = rect.h;
    }

    fn is_filter(&self) -> bool {
        self.kind == ChartKind::Filter
    }
}

impl GridItem for Card {
    fn item_id(&self) -> &str {
        &self.id
    }

    fn rect(&self) -> GridRect {
        self.grid_position.rect()
    }

    fn set_rect(&mut self, rect: GridRect) {
        self.grid_position.set_rect(rect);
    }
}

/// Widths beyond the grid are clamped to the grid width.
pub fn clamp_width(w: u32) -> u32 {
    w.min(GRID_COLUMNS)
}

/// Position for a new card of width `w`: to the right of the last row if it fits,
/// else below the tallest card of that row. The new card's height plays no part.
pub fn place_new<I>(visible: I, w: u32) -> (u32, u32)
where
    I: IntoIterator<Item = GridRect>,
{
    let mut rows: BTreeMap<u32, Vec<GridRect>> = BTreeMap::new();
    for rect in visible {
        rows.entry(rect.y).or_default().push(rect);
    }

    let Some((&last_y, last_row)) = rows.iter().next_back() else {
        return (0, 0);
    };

    let rightmost = last_row.iter().map(GridRect::right).max().unwrap_or(0);
    if rightmost.saturating_add(clamp_width(w)) <= GRID_COLUMNS {
        (rightmost, last_y)
    } else {
        let tallest = last_row.iter().map(|r| r.h).max().unwrap_or(0);
        (0, last_y.saturating_add(tallest))
    }
}

/// Greedy row packing by descending area (stable for ties).
/// Returns one rectangle per input, in input order.
pub fn pack_rows(rects: &[GridRect]) -> Vec<GridRect> {
    let sized: Vec<GridRect> = rects
        .iter()
        .map(|r| GridRect::new(r.x, r.y, clamp_width(r.w), r.h))
        .collect();

    let mut order: Vec<usize> = (0..sized.len()).collect();
    order.sort_by(|&a, &b| sized[b].area().cmp(&sized[a].area()));

    let mut placed = sized.clone();
    let mut current_y: u32 = 0;
    let mut row: Vec<usize> = Vec::new();
    let mut row_width = 0;

    let flush = |row: &mut Vec<usize>, current_y: u32, placed: &mut Vec<GridRect>| -> u32 {
        let mut x = 0;
        let mut tallest = 0;
        for &index in row.iter() {
            let rect = sized[index];
            placed[index] = GridRect::new(x, current_y, rect.w, rect.h);
            x += rect.w;
            tallest = tallest.max(rect.h);
        }
        row.clear();
        tallest
    };

    for index in order {
        let w = sized[index].w;
        if row_width + w > GRID_COLUMNS && !row.is_empty() {
            current_y = current_y.saturating_add(flush(&mut row, current_y, &mut placed));
            row_width = 0;
        }
        row.push(index);
        row_width += w;
    }
    if !row.is_empty() {
        flush(&mut row, current_y, &mut placed);
    }

    placed
}

/// Repack the visible, non-filter items. Everything else keeps its stored position.
/// Returns the ids that were repositioned.
pub fn auto_organize<T, F>(items: &mut [T], is_visible: F) -> Vec<String>
where
    T: GridItem,
    F: Fn(&T) -> bool,
{
    let selected: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.is_filter() && is_visible(*item))
        .map(|(index, _)| index)
        .collect();

    let rects: Vec<GridRect> = selected.iter().map(|&i| items[i].rect()).collect();
    let packed = pack_rows(&rects);

    let mut moved = Vec::with_capacity(selected.len());
    for (&index, rect) in selected.iter().zip(packed) {
        items[index].set_rect(rect);
        moved.push(items[index].item_id().to_string());
    }
    tracing::debug!(count = moved.len(), "auto-organized cards");
    moved
}

/// Suffix after the last `-` of an id; template entries are matched on it.
pub fn id_suffix(id: &str) -> &str {
    id.rsplit('-').next().unwrap_or(id)
}

/// Copy template rectangles onto visible items with a matching id suffix.
/// Returns the ids that were repositioned.
pub fn apply_template<T, U, F>(items: &mut [T], template: &[U], is_visible: F) -> Vec<String>
where
    T: GridItem,
    U: GridItem,
    F: Fn(&T) -> bool,
{
    let mut moved = Vec::new();
    for item in items.iter_mut() {
        if !is_visible(item) {
            continue;
        }
        let suffix = id_suffix(item.item_id()).to_string();
        if let Some(entry) = template.iter().find(|t| id_suffix(t.item_id()) == suffix) {
            item.set_rect(entry.rect());
            moved.push(item.item_id().to_string());
        }
    }
    moved
}

/// Positions for a run of filters: wrap to a new row whenever the next one would pass the grid edge.
pub fn filter_row_layout<I>(widths: I) -> Vec<(u32, u32)>
where
    I: IntoIterator<Item = u32>,
{
    let mut x = 0;
    let mut y = 0;
    let mut positions = Vec::new();
    for w in widths {
        let w = clamp_width(w);
        if x + w > GRID_COLUMNS {
            x = 0;
            y += FILTER_ROW_HEIGHT;
        }
        positions.push((x, y));
        x += w;
    }
    positions
}

/// First pair of items whose rectangles overlap, if any.
pub fn find_overlap<T: GridItem>(items: &[T]) -> Option<(String, String)> {
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            if a.rect().overlaps(&b.rect()) {
                return Some((a.item_id().to_string(), b.item_id().to_string()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn card(id: &str, kind: ChartKind, w: u32, h: u32) -> BoardCard {
        BoardCard::new(id, kind, id, GridRect::new(0, 0, w, h))
    }

    #[test]
    fn test_place_new_on_empty_grid() {
        assert_eq!(place_new(Vec::new(), 6), (0, 0));
    }

    #[test]
    fn test_place_new_same_row_when_it_fits() {
        let rects = vec![GridRect::new(0, 0, 8, 5), GridRect::new(8, 0, 4, 3)];
        assert_eq!(place_new(rects, 6), (12, 0));
    }

    #[test]
    fn test_place_new_wraps_below_tallest_of_last_row() {
        let rects = vec![
            GridRect::new(0, 0, 18, 2),
            GridRect::new(0, 2, 8, 5),
            GridRect::new(8, 2, 6, 3),
        ];
        assert_eq!(place_new(rects, 6), (0, 7));
    }

    #[test]
    fn test_place_new_clamps_oversized_width() {
        let rects = vec![GridRect::new(0, 0, 4, 3)];
        assert_eq!(place_new(rects, 40), (0, 3));
    }

    #[test]
    fn test_row_wrap_example() {
        let mut cards = vec![
            card("a", ChartKind::Line, 8, 5),
            card("b", ChartKind::Line, 8, 4),
            card("c", ChartKind::Line, 8, 3),
        ];
        auto_organize(&mut cards, |_| true);

        assert_eq!(cards[0].rect(), GridRect::new(0, 0, 8, 5));
        assert_eq!(cards[1].rect(), GridRect::new(8, 0, 8, 4));
        assert_eq!(cards[2].rect(), GridRect::new(0, 5, 8, 3));
    }

    #[test]
    fn test_auto_organize_sorts_by_area_with_stable_ties() {
        let mut cards = vec![
            card("small", ChartKind::Number, 3, 3),
            card("big", ChartKind::Table, 8, 6),
            card("tie-1", ChartKind::Bar, 6, 5),
            card("tie-2", ChartKind::Scatter, 6, 5),
        ];
        auto_organize(&mut cards, |_| true);

        let by_id = |id: &str| cards.iter().find(|c| c.id == id).unwrap().rect();
        assert_eq!(by_id("big"), GridRect::new(0, 0, 8, 6));
        assert_eq!(by_id("tie-1"), GridRect::new(8, 0, 6, 5));
        assert_eq!(by_id("tie-2"), GridRect::new(0, 6, 6, 5));
        assert_eq!(by_id("small"), GridRect::new(6, 6, 3, 3));
    }

    #[test]
    fn test_auto_organize_skips_filters_and_hidden_items() {
        let mut cards = vec![
            card("filter", ChartKind::Filter, 3, 2),
            card("other-tab", ChartKind::Bar, 6, 5),
            card("here", ChartKind::Pie, 4, 5),
        ];
        cards[0].set_rect(GridRect::new(5, 9, 3, 2));
        cards[1].set_rect(GridRect::new(2, 4, 6, 5));
        cards[2].set_rect(GridRect::new(10, 10, 4, 5));

        let moved = auto_organize(&mut cards, |c| c.id != "other-tab");
        assert_eq!(moved, vec!["here".to_string()]);
        assert_eq!(cards[0].rect(), GridRect::new(5, 9, 3, 2));
        assert_eq!(cards[1].rect(), GridRect::new(2, 4, 6, 5));
        assert_eq!(cards[2].rect(), GridRect::new(0, 0, 4, 5));
    }

    #[test]
    fn test_auto_organize_clamps_overflowing_cards() {
        let mut cards = vec![card("wide", ChartKind::Table, 30, 4), card("n", ChartKind::Number, 3, 3)];
        auto_organize(&mut cards, |_| true);

        assert_eq!(cards[0].rect(), GridRect::new(0, 0, 18, 4));
        assert_eq!(cards[1].rect(), GridRect::new(0, 4, 3, 3));
        assert!(find_overlap(&cards).is_none());
    }

    #[test]
    fn test_auto_organize_handles_very_tall_cards() {
        let mut cards = vec![
            card("small", ChartKind::Bar, 6, 5),
            card("tall", ChartKind::Table, 18, 300_000_000),
        ];
        auto_organize(&mut cards, |_| true);

        assert_eq!(cards[1].rect(), GridRect::new(0, 0, 18, 300_000_000));
        assert_eq!(cards[0].rect(), GridRect::new(0, 300_000_000, 6, 5));
        assert!(find_overlap(&cards).is_none());
    }

    #[test]
    fn test_apply_template_matches_numeric_suffix() {
        let template = vec![
            BoardCard::new("card-100-1", ChartKind::Number, "t", GridRect::new(0, 0, 4, 3)),
            BoardCard::new("card-100-2", ChartKind::Trend, "t", GridRect::new(4, 0, 5, 3)),
        ];
        let mut cards = vec![
            card("card-555-2", ChartKind::Trend, 3, 3),
            card("card-555-9", ChartKind::Bar, 6, 5),
        ];

        let moved = apply_template(&mut cards, &template, |_| true);
        assert_eq!(moved, vec!["card-555-2".to_string()]);
        assert_eq!(cards[0].rect(), GridRect::new(4, 0, 5, 3));
        assert_eq!(cards[1].rect(), GridRect::new(0, 0, 6, 5));
    }

    #[test]
    fn test_filter_wrap_example() {
        assert_eq!(
            filter_row_layout([4, 3, 4, 3, 4]),
            vec![(0, 0), (4, 0), (7, 0), (11, 0), (14, 0)]
        );
        assert_eq!(
            filter_row_layout([4, 3, 4, 3, 4, 3, 8, 8]),
            vec![(0, 0), (4, 0), (7, 0), (11, 0), (14, 0), (0, 2), (3, 2), (0, 4)]
        );
    }

    #[test]
    fn test_dashboard_cards_are_grid_items() {
        use crate::domain::card::{CardContent, GridPosition};
        let text = |id: &str, w| {
            Card::new(
                id,
                GridPosition::at(0, 0, w, 2),
                CardContent::Text {
                    content: String::new(),
                    variables: Default::default(),
                },
            )
        };
        let mut cards = vec![text("a", 12), text("b", 12)];
        assert!(find_overlap(&cards).is_some());
        auto_organize(&mut cards, |_| true);
        assert!(find_overlap(&cards).is_none());
        assert_eq!(cards[1].grid_position.y, 2);
    }

    proptest! {
        #[test]
        fn prop_auto_organize_never_overlaps(sizes in prop::collection::vec((1u32..30, 1u32..8), 0..40)) {
            let mut cards: Vec<BoardCard> = sizes
                .iter()
                .enumerate()
                .map(|(i, (w, h))| card(&format!("card-{i}"), ChartKind::Bar, *w, *h))
                .collect();

            auto_organize(&mut cards, |_| true);

            prop_assert!(find_overlap(&cards).is_none());
            for c in &cards {
                prop_assert!(c.x + c.w <= GRID_COLUMNS);
            }
        }

        #[test]
        fn prop_auto_organize_tall_cards_keep_area_order(sizes in prop::collection::vec((1u32..30, 1u32..100_000_000), 1..40)) {
            let mut cards: Vec<BoardCard> = sizes
                .iter()
                .enumerate()
                .map(|(i, (w, h))| card(&format!("card-{i}"), ChartKind::Bar, *w, *h))
                .collect();

            auto_organize(&mut cards, |_| true);

            prop_assert!(find_overlap(&cards).is_none());
            let mut placed: Vec<&BoardCard> = cards.iter().collect();
            placed.sort_by_key(|c| (c.y, c.x));
            for pair in placed.windows(2) {
                prop_assert!(pair[0].rect().area() >= pair[1].rect().area());
            }
        }
    }
}
