// Variable substitution - {{param}} tokens and [[... if {{param}} exists]] blocks
use crate::domain::parameter::{Parameter, ParameterValues, display_value};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("token pattern"));

static CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[(.+?) if \{\{([A-Za-z0-9_]+)\}\} exists\]\]").expect("conditional pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Text,
    Url,
}

/// Substitutes effective parameter values into titles, markdown and URLs.
#[derive(Debug, Clone, Copy)]
pub struct Substitution<'a> {
    parameters: &'a [Parameter],
    effective: &'a ParameterValues,
    locals: Option<&'a BTreeMap<String, String>>,
}

impl<'a> Substitution<'a> {
    pub fn new(parameters: &'a [Parameter], effective: &'a ParameterValues) -> Self {
        Self {
            parameters,
            effective,
            locals: None,
        }
    }

    /// Card-scoped variables, replaced in a separate pass after parameters.
    pub fn with_locals(mut self, locals: &'a BTreeMap<String, String>) -> Self {
        self.locals = Some(locals);
        self
    }

    /// Plain text / markdown substitution. Values are inserted verbatim.
    pub fn text(&self, input: &str) -> String {
        self.apply(input, Mode::Text)
    }

    /// URL substitution. Values are percent-encoded like `encodeURIComponent`.
    pub fn url(&self, input: &str) -> String {
        self.apply(input, Mode::Url)
    }

    fn apply(&self, input: &str, mode: Mode) -> String {
        let conditioned = CONDITIONAL.replace_all(input, |caps: &Captures| {
            if self.exists(&caps[2]) {
                caps[1].to_string()
            } else {
                String::new()
            }
        });

        let substituted = TOKEN.replace_all(&conditioned, |caps: &Captures| {
            match self.lookup(&caps[1]) {
                Some(value) if !value.is_null() => {
                    let shown = display_value(value);
                    match mode {
                        Mode::Text => shown,
                        Mode::Url => encode_uri_component(&shown),
                    }
                }
                _ => caps[0].to_string(),
            }
        });

        let mut output = substituted.into_owned();
        if let Some(locals) = self.locals {
            for (name, value) in locals {
                let token = format!("{{{{{name}}}}}");
                let replacement = match mode {
                    Mode::Text => value.clone(),
                    Mode::Url => encode_uri_component(value),
                };
                output = output.replace(&token, &replacement);
            }
        }
        output
    }

    /// Resolves an identifier by slug, then name, then id.
    fn lookup(&self, identifier: &str) -> Option<&'a Value> {
        let parameter = self.resolve(identifier)?;
        self.effective.get(&parameter.id)
    }

    fn resolve(&self, identifier: &str) -> Option<&'a Parameter> {
        self.parameters
            .iter()
            .find(|p| p.slug == identifier)
            .or_else(|| self.parameters.iter().find(|p| p.name == identifier))
            .or_else(|| self.parameters.iter().find(|p| p.id == identifier))
    }

    /// Parameters first; an identifier naming no parameter falls back to card-local variables.
    fn exists(&self, identifier: &str) -> bool {
        if self.resolve(identifier).is_none() {
            return self
                .locals
                .and_then(|locals| locals.get(identifier))
                .is_some_and(|value| !value.is_empty());
        }
        match self.lookup(identifier) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

pub fn substitute(
    text: &str,
    effective: &ParameterValues,
    parameters: &[Parameter],
    locals: Option<&BTreeMap<String, String>>,
) -> String {
    let mut engine = Substitution::new(parameters, effective);
    if let Some(locals) = locals {
        engine = engine.with_locals(locals);
    }
    engine.text(text)
}

pub fn substitute_url(text: &str, effective: &ParameterValues, parameters: &[Parameter]) -> String {
    Substitution::new(parameters, effective).url(text)
}

/// `encodeURIComponent`: everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
pub fn encode_uri_component(input: &str) -> String {
    urlencoding::encode(input)
        .replace("%21", "!")
        .replace("%2A", "*")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
}
