// Sample dashboards shared by unit tests, read from the bundled catalog
use super::dashboard::Dashboard;

const CATALOG: &str = include_str!("../../config/dashboards.json");

pub fn catalog() -> Vec<Dashboard> {
    serde_json::from_str(CATALOG).expect("bundled catalog parses")
}

fn by_id(id: &str) -> Dashboard {
    catalog()
        .into_iter()
        .find(|d| d.id == id)
        .unwrap_or_else(|| panic!("{id} missing from catalog"))
}

/// Public dashboard with region / date range / minimum revenue filters.
pub fn sales_analytics() -> Dashboard {
    by_id("sales-analytics")
}

/// Signed dashboard with `company_id` locked to "12345" and hidden.
pub fn customer_insights() -> Dashboard {
    by_id("customer-insights")
}
