// Builder templates with fixed card layouts
use crate::domain::board::{Board, BoardCard, ChartKind};
use crate::domain::card::GridRect;

pub const HOME_SERVICES_NAME: &str = "Home Services Executive Dashboard";

const HOME_SERVICES_TABS: [&str; 5] = [
    "Overview",
    "Service Performance",
    "Customer Insights",
    "Financials",
    "Operations",
];

// (suffix, tab index, kind, title, x, y, w, h)
type CardRow = (u32, usize, ChartKind, &'static str, u32, u32, u32, u32);

const HOME_SERVICES_CARDS: [CardRow; 37] = [
    (1, 0, ChartKind::Number, "Total Revenue MTD", 0, 0, 4, 3),
    (2, 0, ChartKind::Trend, "Active Jobs", 4, 0, 5, 3),
    (3, 0, ChartKind::Number, "Customer Satisfaction", 9, 0, 4, 3),
    (4, 0, ChartKind::Gauge, "On-Time Completion Rate", 13, 0, 5, 3),
    (5, 0, ChartKind::Line, "Revenue Trend - Last 12 Months", 0, 3, 9, 5),
    (6, 0, ChartKind::Bar, "Service Calls by Type", 9, 3, 9, 5),
    (7, 0, ChartKind::Pie, "Revenue by Service Category", 0, 8, 6, 4),
    (8, 0, ChartKind::Table, "Top Performing Technicians", 6, 8, 7, 4),
    (10, 0, ChartKind::Text, "Executive Summary", 13, 8, 5, 4),
    (12, 1, ChartKind::Bar, "Average Response Time by Service Type", 0, 0, 6, 4),
    (13, 1, ChartKind::Line, "First-Time Fix Rate Trend", 6, 0, 6, 4),
    (14, 1, ChartKind::Scatter, "Job Duration vs Complexity", 12, 0, 6, 4),
    (15, 1, ChartKind::Funnel, "Service Request to Completion", 0, 4, 9, 4),
    (16, 1, ChartKind::Pivot, "Service Metrics by Region", 9, 4, 9, 4),
    (17, 1, ChartKind::Progress, "Monthly Service Goal", 0, 8, 6, 3),
    (18, 1, ChartKind::Number, "Avg Service Rating", 6, 8, 6, 3),
    (37, 1, ChartKind::Gauge, "Efficiency Score", 12, 8, 6, 3),
    (19, 2, ChartKind::Donut, "Customer Segments", 0, 0, 6, 4),
    (20, 2, ChartKind::Area, "Customer Acquisition Trend", 6, 0, 12, 4),
    (21, 2, ChartKind::Bar, "Customer Lifetime Value by Segment", 0, 4, 9, 4),
    (22, 2, ChartKind::Table, "Recent Customer Feedback", 9, 4, 9, 4),
    (23, 2, ChartKind::Number, "Net Promoter Score", 0, 8, 6, 3),
    (24, 2, ChartKind::Trend, "Repeat Customers", 6, 8, 6, 3),
    (38, 2, ChartKind::Progress, "Satisfaction Target", 12, 8, 6, 3),
    (25, 3, ChartKind::Number, "Gross Margin %", 0, 0, 6, 3),
    (26, 3, ChartKind::Number, "Operating Expenses", 6, 0, 6, 3),
    (27, 3, ChartKind::Trend, "Cash Flow", 12, 0, 6, 3),
    (28, 3, ChartKind::Area, "Revenue vs Costs Trend", 0, 3, 18, 4),
    (29, 3, ChartKind::Bar, "Revenue by Payment Method", 0, 7, 9, 4),
    (30, 3, ChartKind::Table, "Outstanding Invoices", 9, 7, 9, 4),
    (31, 4, ChartKind::Gauge, "Fleet Utilization", 0, 0, 6, 3),
    (32, 4, ChartKind::Number, "Active Technicians", 6, 0, 6, 3),
    (33, 4, ChartKind::Progress, "Inventory Health", 12, 0, 6, 3),
    (34, 4, ChartKind::Line, "Technician Productivity Trend", 0, 3, 9, 4),
    (39, 4, ChartKind::Bar, "Inventory Levels by Category", 9, 3, 9, 4),
    (35, 4, ChartKind::Table, "Equipment Maintenance Schedule", 0, 7, 9, 4),
    (36, 4, ChartKind::Pie, "Time Allocation by Activity", 9, 7, 9, 4),
];

// (tab index, sequence, title, x, w)
const HOME_SERVICES_FILTERS: [(usize, u32, &str, u32, u32); 7] = [
    (0, 1, "Date Range", 0, 4),
    (0, 2, "Service Type", 4, 3),
    (1, 1, "Time Period", 0, 4),
    (1, 2, "Region", 4, 3),
    (2, 1, "Customer Segment", 0, 4),
    (3, 1, "Fiscal Period", 0, 4),
    (4, 1, "Department", 0, 3),
];

/// The Home Services executive board. `stamp` makes ids unique per load.
pub fn home_services_template(stamp: i64) -> Board {
    let cards = HOME_SERVICES_CARDS
        .iter()
        .map(|&(suffix, tab, kind, title, x, y, w, h)| {
            BoardCard::new(
                &format!("card-{stamp}-{suffix}"),
                kind,
                title,
                GridRect::new(x, y, w, h),
            )
            .on_tab(HOME_SERVICES_TABS[tab])
        })
        .collect();

    let filters = HOME_SERVICES_FILTERS
        .iter()
        .map(|&(tab, sequence, title, x, w)| {
            let tab_name = HOME_SERVICES_TABS[tab];
            BoardCard::new(
                &format!("filter-{tab_name}-{stamp}-{sequence}"),
                ChartKind::Filter,
                title,
                GridRect::new(x, 0, w, 2),
            )
            .on_tab(tab_name)
        })
        .collect();

    Board {
        name: HOME_SERVICES_NAME.to_string(),
        tabs: HOME_SERVICES_TABS.iter().map(|t| t.to_string()).collect(),
        cards,
        filters,
    }
}
