// Dashboard rendering - view models with substituted titles, markdown and URLs
use super::resolution::is_editable;
use super::session::{Capabilities, DashboardSession};
use super::substitution::Substitution;
use crate::domain::card::{
    ActionColor, ActionKind, Card, CardContent, GridPosition, VisualizationConfig, VisualizationType,
};
use crate::domain::dashboard::{EmbedTheme, EmbedType, GridLayoutConfig};
use crate::domain::parameter::{Parameter, ParameterType, ParameterValues, WidgetConfig, WidgetType};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Sandbox used for iframe cards that do not declare one.
pub const DEFAULT_IFRAME_SANDBOX: [&str; 2] = ["allow-scripts", "allow-same-origin"];

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\(([^)\s]+)\)").expect("markdown link pattern"));

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub embed_type: EmbedType,
    pub show_header: bool,
    pub bordered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<EmbedTheme>,
    pub fullscreen: bool,
    pub show_filters: bool,
    pub tabs: Vec<TabView>,
    pub parameters: Vec<ParameterView>,
    pub cards: Vec<RenderedCard>,
    pub layout: GridLayoutConfig,
    pub capabilities: Capabilities,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabView {
    pub id: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterView {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub widget: WidgetType,
    pub widget_config: WidgetConfig,
    pub editable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCard {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub position: GridPosition,
    #[serde(flatten)]
    pub body: CardBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CardBody {
    #[serde(rename_all = "camelCase")]
    Question {
        visualization: VisualizationType,
        display_config: VisualizationConfig,
        export_menu: bool,
        drill_through: bool,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        markdown: String,
        link_targets: Vec<String>,
    },
    Link {
        href: String,
        target: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Action {
        action_type: ActionKind,
        label: String,
        color: ActionColor,
        #[serde(skip_serializing_if = "Option::is_none")]
        confirmation: Option<String>,
    },
    Iframe {
        src: String,
        sandbox: String,
        height: u32,
    },
}

pub fn render_dashboard(session: &DashboardSession) -> DashboardView {
    let dashboard = session.dashboard();
    let embed_config = session.embed_config();
    let effective = session.effective_parameters();
    let capabilities = session.capabilities();
    let substitution = Substitution::new(&dashboard.parameters, &effective);
    let active_tab = session.active_tab();

    let tabs = dashboard
        .ordered_tabs()
        .into_iter()
        .filter(|tab| tab.visible)
        .map(|tab| TabView {
            id: tab.id.clone(),
            name: tab.name.clone(),
            active: active_tab.is_some_and(|active| active.id == tab.id),
        })
        .collect();

    let parameters = session
        .visible_parameters()
        .into_iter()
        .map(|parameter| ParameterView {
            id: parameter.id.clone(),
            name: parameter.name.clone(),
            slug: parameter.slug.clone(),
            kind: parameter.kind,
            widget: parameter.widget,
            widget_config: parameter.widget_config.clone(),
            editable: is_editable(parameter, embed_config),
            value: effective.get(&parameter.id).cloned(),
        })
        .collect();

    let cards = active_tab
        .map(|tab| {
            tab.cards
                .iter()
                .filter(|card| card.is_visible(&effective))
                .map(|card| render_card(card, &dashboard.parameters, &effective, &capabilities))
                .collect()
        })
        .unwrap_or_default();

    DashboardView {
        id: dashboard.id.clone(),
        title: substitution.text(&dashboard.title),
        description: dashboard.description.as_deref().map(|d| substitution.text(d)),
        embed_type: dashboard.embed_type,
        show_header: embed_config.titled,
        bordered: embed_config.bordered,
        theme: embed_config.theme,
        fullscreen: embed_config.fullscreen,
        show_filters: !embed_config.hide_parameters && !dashboard.parameters.is_empty(),
        tabs,
        parameters,
        cards,
        layout: dashboard.layout.clone(),
        capabilities,
        is_loading: session.is_loading(),
    }
}

pub fn render_card(
    card: &Card,
    parameters: &[Parameter],
    effective: &ParameterValues,
    capabilities: &Capabilities,
) -> RenderedCard {
    let substitution = Substitution::new(parameters, effective);

    let body = match &card.content {
        CardContent::Question {
            visualization,
            display_config,
            ..
        } => CardBody::Question {
            visualization: *visualization,
            display_config: display_config.clone(),
            export_menu: capabilities.can_export,
            drill_through: capabilities.can_drill_through,
        },
        CardContent::Text { content, variables } => {
            let scoped = substitution.with_locals(variables);
            let markdown = scoped.text(content);
            let link_targets = MARKDOWN_LINK
                .captures_iter(content)
                .map(|caps| scoped.url(&caps[1]))
                .collect();
            CardBody::Text {
                markdown,
                link_targets,
            }
        }
        CardContent::Link {
            url,
            open_in_new_tab,
            icon,
        } => CardBody::Link {
            href: substitution.url(url),
            target: if *open_in_new_tab { "_blank" } else { "_self" },
            icon: icon.clone(),
        },
        CardContent::Action {
            action_type,
            label,
            color,
            confirmation,
            ..
        } => CardBody::Action {
            action_type: *action_type,
            label: label.clone(),
            color: *color,
            confirmation: confirmation.clone(),
        },
        CardContent::Iframe { url, height, sandbox } => CardBody::Iframe {
            src: substitution.url(url),
            sandbox: match sandbox {
                Some(tokens) => tokens.join(" "),
                None => DEFAULT_IFRAME_SANDBOX.join(" "),
            },
            height: *height,
        },
    };

    RenderedCard {
        id: card.id.clone(),
        title: card.title.as_deref().map(|t| substitution.text(t)),
        subtitle: card.subtitle.as_deref().map(|t| substitution.text(t)),
        position: card.grid_position.clone(),
        body,
    }
}
