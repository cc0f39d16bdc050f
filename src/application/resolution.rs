// Parameter resolution - effective values, visibility and editability under an embed config
use crate::domain::dashboard::EmbedConfig;
use crate::domain::parameter::{Parameter, ParameterType, ParameterValues};
use serde_json::Value;

/// Precedence: locked by the embed host, then the raw (user/URL) value, then the default.
pub fn resolve_effective_value(
    parameter: &Parameter,
    raw: Option<&Value>,
    embed_config: &EmbedConfig,
) -> Option<Value> {
    if let Some(locked) = embed_config.locked_parameters.get(&parameter.id) {
        return Some(locked.clone());
    }
    if let Some(value) = raw {
        return Some(value.clone());
    }
    parameter.default.clone()
}

pub fn is_visible(parameter: &Parameter, embed_config: &EmbedConfig) -> bool {
    !parameter.hidden && !embed_config.hide_parameters && !embed_config.is_hidden(&parameter.id)
}

pub fn is_editable(parameter: &Parameter, embed_config: &EmbedConfig) -> bool {
    !parameter.locked && !embed_config.is_locked(&parameter.id)
}

/// Effective values for every declared parameter. Raw values for undeclared ids pass through.
pub fn effective_values(
    parameters: &[Parameter],
    raw: &ParameterValues,
    embed_config: &EmbedConfig,
) -> ParameterValues {
    let mut effective = raw.clone();
    for parameter in parameters {
        match resolve_effective_value(parameter, raw.get(&parameter.id), embed_config) {
            Some(value) => {
                effective.insert(parameter.id.clone(), value);
            }
            None => {
                effective.remove(&parameter.id);
            }
        }
    }
    effective
}

/// Coerce a URL-supplied string by parameter type. Dates stay strings for the widget to parse.
pub fn coerce_url_value(kind: ParameterType, text: &str) -> Value {
    match kind {
        ParameterType::Number => parse_float_prefix(text)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ParameterType::Boolean => Value::Bool(text == "true"),
        ParameterType::Date
        | ParameterType::DateRange
        | ParameterType::DateRelative
        | ParameterType::Text
        | ParameterType::Category
        | ParameterType::Location
        | ParameterType::Id => Value::String(text.to_string()),
    }
}

/// Lenient float parse: the longest numeric prefix after leading whitespace ("12px" -> 12).
fn parse_float_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = trimmed.as_bytes();
    while end < bytes.len() {
        let c = bytes[end];
        match c {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 => {}
            b'+' | b'-' if seen_exp && matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    let mut candidate = &trimmed[..end];
    while !candidate.is_empty() {
        if let Ok(value) = candidate.parse::<f64>() {
            return Some(value);
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    if trimmed.starts_with("Infinity") || trimmed.starts_with("+Infinity") {
        return Some(f64::INFINITY);
    }
    None
}

/// Collect URL values for declared parameters, keyed by id.
/// Looks up a non-empty `<slug>` first, then `param_<slug>`.
pub fn values_from_query<'a, I>(parameters: &[Parameter], pairs: I) -> ParameterValues
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
    let lookup = |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

    let mut values = ParameterValues::new();
    for parameter in parameters {
        let prefixed = format!("param_{}", parameter.slug);
        let found = lookup(&parameter.slug)
            .filter(|text| !text.is_empty())
            .or_else(|| lookup(&prefixed));
        if let Some(text) = found {
            values.insert(parameter.id.clone(), coerce_url_value(parameter.kind, text));
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parameter::WidgetType;
    use serde_json::json;

    fn region() -> Parameter {
        Parameter::new("region", "Region", ParameterType::Category, WidgetType::Dropdown)
            .with_default(json!("North America"))
    }

    #[test]
    fn test_default_fallback() {
        let config = EmbedConfig::default();
        assert_eq!(
            resolve_effective_value(&region(), None, &config),
            Some(json!("North America"))
        );
        let bare = Parameter::new("q", "Q", ParameterType::Text, WidgetType::Input);
        assert_eq!(resolve_effective_value(&bare, None, &config), None);
    }

    #[test]
    fn test_raw_beats_default_and_lock_beats_raw() {
        let mut config = EmbedConfig::default();
        let raw = json!("Europe");
        assert_eq!(resolve_effective_value(&region(), Some(&raw), &config), Some(raw.clone()));

        config.locked_parameters.insert("region".to_string(), json!("Asia Pacific"));
        assert_eq!(
            resolve_effective_value(&region(), Some(&raw), &config),
            Some(json!("Asia Pacific"))
        );
    }

    #[test]
    fn test_null_raw_value_counts_as_defined() {
        let config = EmbedConfig::default();
        assert_eq!(
            resolve_effective_value(&region(), Some(&Value::Null), &config),
            Some(Value::Null)
        );
    }

    #[test]
    fn test_visibility_rules() {
        let mut config = EmbedConfig::default();
        assert!(is_visible(&region(), &config));
        assert!(!is_visible(&region().hidden(), &config));

        config.hidden_parameters.insert("region".to_string());
        assert!(!is_visible(&region(), &config));

        let config = EmbedConfig {
            hide_parameters: true,
            ..EmbedConfig::default()
        };
        assert!(!is_visible(&region(), &config));
    }

    #[test]
    fn test_editability_rules() {
        let mut config = EmbedConfig::default();
        assert!(is_editable(&region(), &config));
        assert!(!is_editable(&region().locked(), &config));

        config.locked_parameters.insert("region".to_string(), json!("EU"));
        assert!(!is_editable(&region(), &config));
    }

    #[test]
    fn test_effective_values_drops_undefined_and_keeps_extra_raw() {
        let bare = Parameter::new("q", "Q", ParameterType::Text, WidgetType::Input);
        let mut raw = ParameterValues::new();
        raw.insert("other".to_string(), json!(1));

        let values = effective_values(&[region(), bare], &raw, &EmbedConfig::default());
        assert_eq!(values.get("region"), Some(&json!("North America")));
        assert!(!values.contains_key("q"));
        assert_eq!(values.get("other"), Some(&json!(1)));
    }

    #[test]
    fn test_coerce_url_value() {
        assert_eq!(coerce_url_value(ParameterType::Number, "1500"), json!(1500.0));
        assert_eq!(coerce_url_value(ParameterType::Number, "12.5abc"), json!(12.5));
        assert_eq!(coerce_url_value(ParameterType::Number, "abc"), Value::Null);
        assert_eq!(coerce_url_value(ParameterType::Boolean, "true"), json!(true));
        assert_eq!(coerce_url_value(ParameterType::Boolean, "1"), json!(false));
        assert_eq!(coerce_url_value(ParameterType::DateRange, "2025-01-01~2025-02-01"), json!("2025-01-01~2025-02-01"));
        assert_eq!(coerce_url_value(ParameterType::Category, "Europe"), json!("Europe"));
    }

    #[test]
    fn test_values_from_query_prefers_bare_slug() {
        let min_revenue = Parameter::new("min_revenue", "Minimum Revenue", ParameterType::Number, WidgetType::NumberInput);
        let pairs = vec![
            ("param_region", "Asia Pacific"),
            ("region", "Europe"),
            ("param_min_revenue", "2000"),
            ("unrelated", "x"),
        ];

        let values = values_from_query(&[region(), min_revenue], pairs);
        assert_eq!(values.get("region"), Some(&json!("Europe")));
        assert_eq!(values.get("min_revenue"), Some(&json!(2000.0)));
        assert_eq!(values.len(), 2);
    }
}
