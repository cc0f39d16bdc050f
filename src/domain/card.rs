// Dashboard card model
use super::parameter::ParameterValues;
use super::query::Query;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A rectangle in grid units (not pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl GridRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }

    /// Shared interior; touching edges do not count.
    pub fn overlaps(&self, other: &GridRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPosition {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

impl GridPosition {
    pub fn at(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            min_w: None,
            max_w: None,
            min_h: None,
            max_h: None,
            is_static: false,
        }
    }

    pub fn rect(&self) -> GridRect {
        GridRect::new(self.x, self.y, self.w, self.h)
    }

    pub fn set_rect(&mut self, rect: GridRect) {
        self.x = rect.x;
        self.y = rect.y;
        self.w = rect.w;
        self.h = rect.h;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
}

/// Shows a card only while a parameter's effective value satisfies the comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityCondition {
    pub parameter: String,
    pub operator: ComparisonOperator,
    pub value: Value,
}

impl VisibilityCondition {
    pub fn evaluate(&self, effective: &ParameterValues) -> bool {
        let current = effective.get(&self.parameter);
        match self.operator {
            ComparisonOperator::Equal => current.is_some_and(|v| values_equal(v, &self.value)),
            ComparisonOperator::NotEqual => !current.is_some_and(|v| values_equal(v, &self.value)),
            ComparisonOperator::Greater => compare(current, &self.value) == Some(Ordering::Greater),
            ComparisonOperator::Less => compare(current, &self.value) == Some(Ordering::Less),
            ComparisonOperator::GreaterOrEqual => matches!(
                compare(current, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            ComparisonOperator::LessOrEqual => matches!(
                compare(current, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            ComparisonOperator::In => match (&self.value, current) {
                (Value::Array(items), Some(v)) => items.iter().any(|item| values_equal(item, v)),
                _ => false,
            },
            ComparisonOperator::NotIn => match (&self.value, current) {
                (Value::Array(items), Some(v)) => !items.iter().any(|item| values_equal(item, v)),
                (Value::Array(_), None) => true,
                _ => false,
            },
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(current: Option<&Value>, target: &Value) -> Option<Ordering> {
    match (current?, target) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    Bar,
    Line,
    Area,
    Pie,
    Scatter,
    Funnel,
    Gauge,
    Progress,
    Number,
    Trend,
    Table,
    Pivot,
    Map,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trendline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_line: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional_formatting: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillThroughKind {
    Dashboard,
    Url,
    Filter,
    Zoom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillThroughConfig {
    #[serde(rename = "type")]
    pub kind: DrillThroughKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub parameter_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Query,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionColor {
    Primary,
    Secondary,
    Danger,
    Warning,
}

/// Variant payload of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CardContent {
    #[serde(rename_all = "camelCase")]
    Question {
        visualization: VisualizationType,
        query: Query,
        #[serde(default)]
        display_config: VisualizationConfig,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        drill_through: Option<DrillThroughConfig>,
    },
    Text {
        content: String,
        /// Card-scoped `{{name}}` replacements, applied after parameters.
        #[serde(default)]
        variables: BTreeMap<String, String>,
    },
    #[serde(rename_all = "camelCase")]
    Link {
        url: String,
        #[serde(default)]
        open_in_new_tab: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Action {
        action_type: ActionKind,
        label: String,
        color: ActionColor,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confirmation: Option<String>,
        #[serde(default)]
        payload: Value,
    },
    Iframe {
        url: String,
        height: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sandbox: Option<Vec<String>>,
    },
}

impl CardContent {
    pub fn type_name(&self) -> &'static str {
        match self {
            CardContent::Question { .. } => "question",
            CardContent::Text { .. } => "text",
            CardContent::Link { .. } => "link",
            CardContent::Action { .. } => "action",
            CardContent::Iframe { .. } => "iframe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub grid_position: GridPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<VisibilityCondition>,
    #[serde(flatten)]
    pub content: CardContent,
}

impl Card {
    pub fn new(id: &str, position: GridPosition, content: CardContent) -> Self {
        Self {
            id: id.to_string(),
            tab_id: None,
            title: None,
            subtitle: None,
            grid_position: position,
            visibility_condition: None,
            content,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn is_visible(&self, effective: &ParameterValues) -> bool {
        self.visibility_condition
            .as_ref()
            .is_none_or(|condition| condition.evaluate(effective))
    }
}
