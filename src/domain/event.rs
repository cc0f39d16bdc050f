// Session events and cross-frame messages
use super::parameter::ParameterValues;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DashboardEvent {
    FilterChange(FilterChange),
    #[serde(rename_all = "camelCase")]
    CardClick { card_id: String },
    #[serde(rename_all = "camelCase")]
    TabChange { tab_id: String, tab_name: String },
    Refresh { timestamp: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    Export { card_id: Option<String>, format: String },
}

/// Payload of a `filter_change` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterChange {
    /// `{paramId, value, allParams}`
    #[serde(rename_all = "camelCase")]
    Single {
        param_id: String,
        value: Value,
        all_params: ParameterValues,
    },
    /// `{params}` after a batched write.
    Batch { params: ParameterValues },
}

impl FilterChange {
    /// Every raw value after the write.
    pub fn values(&self) -> &ParameterValues {
        match self {
            FilterChange::Single { all_params, .. } => all_params,
            FilterChange::Batch { params } => params,
        }
    }
}

impl DashboardEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardEvent::FilterChange(_) => "filter_change",
            DashboardEvent::CardClick { .. } => "card_click",
            DashboardEvent::TabChange { .. } => "tab_change",
            DashboardEvent::Refresh { .. } => "refresh",
            DashboardEvent::Export { .. } => "export",
        }
    }
}

pub const PARAMETERS_CHANGE_MESSAGE: &str = "metabase:parameters:change";

/// Message posted to the host page when an embedded dashboard's filters change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub dashboard_id: String,
    pub parameters: ParameterValues,
}

impl FrameMessage {
    pub fn parameters_changed(dashboard_id: &str, parameters: ParameterValues) -> Self {
        Self {
            kind: PARAMETERS_CHANGE_MESSAGE,
            dashboard_id: dashboard_id.to_string(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_message_shape() {
        let mut params = ParameterValues::new();
        params.insert("region".to_string(), json!("EU"));
        let msg = FrameMessage::parameters_changed("sales-analytics", params);

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "metabase:parameters:change",
                "dashboardId": "sales-analytics",
                "parameters": { "region": "EU" }
            })
        );
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = DashboardEvent::TabChange {
            tab_id: "details".to_string(),
            tab_name: "Detailed Analysis".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "tab_change");
        assert_eq!(value["payload"]["tabName"], "Detailed Analysis");
        assert_eq!(event.kind(), "tab_change");
    }

    #[test]
    fn test_filter_change_payload_shapes() {
        let mut params = ParameterValues::new();
        params.insert("region".to_string(), json!("Europe"));

        let single = DashboardEvent::FilterChange(FilterChange::Single {
            param_id: "region".to_string(),
            value: json!("Europe"),
            all_params: params.clone(),
        });
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            json!({
                "type": "filter_change",
                "payload": {"paramId": "region", "value": "Europe", "allParams": {"region": "Europe"}}
            })
        );

        let batch = DashboardEvent::FilterChange(FilterChange::Batch { params });
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({"type": "filter_change", "payload": {"params": {"region": "Europe"}}})
        );
    }
}
