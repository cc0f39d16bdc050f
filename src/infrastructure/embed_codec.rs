// Embed URL codec: build and parse embed links, iframe snippets, sandbox policy
use super::signed_token::{generate_signed_token, TokenError, TokenOptions};
use crate::application::substitution::encode_uri_component;
use crate::domain::dashboard::{EmbedConfig, EmbedConfigPatch, EmbedTheme, EmbedType};
use crate::domain::parameter::{display_value, ParameterValues};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

pub const SIGNED_TOKEN_KEY: &str = "signed";
pub const PARAM_PREFIX: &str = "param_";
pub const DEFAULT_IFRAME_HEIGHT_PX: u32 = 600;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("base url must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),
    #[error("dashboard id is empty")]
    EmptyDashboardId,
    #[error("could not sign embed token")]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone)]
pub struct EmbedOptions<'a> {
    pub base_url: &'a str,
    pub dashboard_id: &'a str,
    pub embed_type: EmbedType,
    pub parameters: &'a ParameterValues,
    pub config: &'a EmbedConfig,
    pub secret_key: Option<&'a [u8]>,
    /// Token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Unix seconds used for the token expiry.
    pub now: i64,
}

/// `<base>/embed/<type>/dashboard/<id>?flags&param_*[#signed=<token>]`
pub fn generate_embed_url(options: &EmbedOptions<'_>) -> Result<String, EmbedError> {
    let base = options.base_url.trim_end_matches('/');
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(EmbedError::InvalidBaseUrl(options.base_url.to_string()));
    }
    if options.dashboard_id.is_empty() {
        return Err(EmbedError::EmptyDashboardId);
    }

    let config = options.config;
    let mut query: Vec<(String, String)> = Vec::new();
    if !config.bordered {
        query.push(("bordered".into(), "false".into()));
    }
    if !config.titled {
        query.push(("titled".into(), "false".into()));
    }
    if let Some(theme) = config.theme {
        query.push(("theme".into(), theme.as_str().into()));
    }
    if config.hide_parameters {
        query.push(("hide_parameters".into(), "true".into()));
    }
    if !config.download_buttons {
        query.push(("hide_download_buttons".into(), "true".into()));
    }

    let signed = options.embed_type == EmbedType::Signed;
    for (key, value) in options.parameters {
        if value.is_null() {
            continue;
        }
        if signed && config.is_locked(key) {
            continue;
        }
        query.push((format!("{PARAM_PREFIX}{key}"), display_value(value)));
    }

    let mut url = format!(
        "{base}/embed/{}/dashboard/{}",
        options.embed_type,
        encode_uri_component(options.dashboard_id)
    );
    if !query.is_empty() {
        let encoded: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
            .collect();
        url.push('?');
        url.push_str(&encoded.join("&"));
    }

    if signed {
        match options.secret_key {
            Some(secret) => {
                let locked = (!config.locked_parameters.is_empty()).then_some(&config.locked_parameters);
                let hidden = (!config.hidden_parameters.is_empty()).then_some(&config.hidden_parameters);
                let token = generate_signed_token(
                    &TokenOptions {
                        dashboard_id: options.dashboard_id,
                        parameters: options.parameters,
                        locked_parameters: locked,
                        hidden_parameters: hidden,
                        expires_in: options.expires_in,
                    },
                    secret,
                    options.now,
                )?;
                url.push('#');
                url.push_str(SIGNED_TOKEN_KEY);
                url.push('=');
                url.push_str(&token);
            }
            None => warn!(
                dashboard = options.dashboard_id,
                "signed embed requested without a secret key; url carries no token"
            ),
        }
    }

    debug!(dashboard = options.dashboard_id, embed_type = %options.embed_type, "generated embed url");
    Ok(url)
}

/// Embed state decoded from a URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEmbed {
    /// `param_*` values, always as strings.
    pub parameters: ParameterValues,
    pub embed_config: EmbedConfigPatch,
    /// Token carried under the `signed` key. Never merged into `parameters`.
    pub signed_token: Option<String>,
}

/// Decode a full embed URL, including the `#signed=` fragment.
pub fn parse_embed_parameters(url: &str) -> ParsedEmbed {
    let (rest, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };
    let query = rest.split_once('?').map(|(_, q)| q).unwrap_or("");
    let mut parsed = parse_embed_query(query);
    if let Some(fragment) = fragment {
        if let Some(token) = query_pairs(fragment)
            .into_iter()
            .find(|(k, _)| k == SIGNED_TOKEN_KEY)
            .map(|(_, v)| v)
        {
            parsed.signed_token = Some(token);
        }
    }
    parsed
}

/// Decode a bare query string (no leading `?`).
pub fn parse_embed_query(query: &str) -> ParsedEmbed {
    let pairs = query_pairs(query);
    parse_embed_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

/// Decode already split key/value pairs. Unknown keys are ignored.
pub fn parse_embed_pairs<'a, I>(pairs: I) -> ParsedEmbed
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut parsed = ParsedEmbed::default();
    for (key, value) in pairs {
        if let Some(id) = key.strip_prefix(PARAM_PREFIX) {
            parsed
                .parameters
                .insert(id.to_string(), serde_json::Value::String(value.to_string()));
            continue;
        }
        let patch = &mut parsed.embed_config;
        match key {
            "bordered" => patch.bordered = Some(value != "false"),
            "titled" => patch.titled = Some(value != "false"),
            "theme" => patch.theme = EmbedTheme::parse(value),
            "hide_parameters" => patch.hide_parameters = Some(value == "true"),
            "hide_download_buttons" => patch.download_buttons = Some(value != "true"),
            SIGNED_TOKEN_KEY => parsed.signed_token = Some(value.to_string()),
            _ => {}
        }
    }
    parsed
}

/// Split and percent-decode `a=1&b=2`; `+` reads as a space.
pub fn query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (k, v) = part.split_once('=').unwrap_or((part, ""));
            (form_decode(k), form_decode(v))
        })
        .collect()
}

fn form_encode(input: &str) -> String {
    urlencoding::encode(input)
        .replace("%20", "+")
        .replace("%2A", "*")
}

fn form_decode(input: &str) -> String {
    let spaced = input.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dimension {
    Px(u32),
    Css(String),
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Px(px) => write!(f, "{px}px"),
            Dimension::Css(css) => f.write_str(css),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IframeOptions {
    pub url: String,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub class_name: Option<String>,
    pub sandbox: Option<Vec<String>>,
}

impl IframeOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
            class_name: None,
            sandbox: None,
        }
    }
}

pub fn default_iframe_sandbox() -> Vec<String> {
    ["allow-scripts", "allow-same-origin", "allow-popups", "allow-forms"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn generate_iframe_code(options: &IframeOptions) -> String {
    let width = options
        .width
        .clone()
        .unwrap_or_else(|| Dimension::Css("100%".to_string()));
    let height = options
        .height
        .clone()
        .unwrap_or(Dimension::Px(DEFAULT_IFRAME_HEIGHT_PX));
    let sandbox = options.sandbox.clone().unwrap_or_else(default_iframe_sandbox);

    let mut lines = vec![
        "<iframe".to_string(),
        format!("  src=\"{}\"", escape_attribute(&options.url)),
        format!("  width=\"{}\"", escape_attribute(&width.to_string())),
        format!("  height=\"{}\"", escape_attribute(&height.to_string())),
        "  frameborder=\"0\"".to_string(),
    ];
    if let Some(class_name) = options.class_name.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("  class=\"{}\"", escape_attribute(class_name)));
    }
    if !sandbox.is_empty() {
        lines.push(format!("  sandbox=\"{}\"", escape_attribute(&sandbox.join(" "))));
    }
    lines.push("  allowtransparency=\"true\"".to_string());
    lines.push("></iframe>".to_string());
    lines.join("\n")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Sandbox tokens an embed of this type is granted.
pub fn sandbox_attributes(embed_type: EmbedType) -> Vec<&'static str> {
    let mut attributes = vec!["allow-scripts", "allow-same-origin"];
    match embed_type {
        EmbedType::Public => {}
        EmbedType::Signed => attributes.push("allow-forms"),
        EmbedType::Interactive | EmbedType::Sdk => {
            attributes.extend(["allow-forms", "allow-popups", "allow-modals"])
        }
    }
    attributes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbedPermission {
    View,
    Export,
    Drill,
    Filter,
    Edit,
}

impl FromStr for EmbedPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(EmbedPermission::View),
            "export" => Ok(EmbedPermission::Export),
            "drill" => Ok(EmbedPermission::Drill),
            "filter" => Ok(EmbedPermission::Filter),
            "edit" => Ok(EmbedPermission::Edit),
            other => Err(format!("unknown permission: {other}")),
        }
    }
}

pub fn allowed_permissions(embed_type: EmbedType) -> &'static [EmbedPermission] {
    use EmbedPermission::*;
    match embed_type {
        EmbedType::Public => &[View],
        EmbedType::Signed => &[View, Export],
        EmbedType::Interactive => &[View, Export, Drill, Filter],
        EmbedType::Sdk => &[View, Export, Drill, Filter, Edit],
    }
}

/// True when every requested permission is granted to the embed type.
pub fn validate_embed_permissions(embed_type: EmbedType, requested: &[EmbedPermission]) -> bool {
    let allowed = allowed_permissions(embed_type);
    requested.iter().all(|p| allowed.contains(p))
}
