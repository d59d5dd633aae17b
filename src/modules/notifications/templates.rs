//! Email bodies rendered with minijinja.
//!
//! Templates are compiled into the binary from `templates/emails/`.

use std::sync::OnceLock;

use minijinja::{AutoEscape, Environment, Value};
use thiserror::Error;

static TEMPLATE_ENV: OnceLock<Result<Environment<'static>, String>> = OnceLock::new();

const TEMPLATES: &[(&str, &str)] = &[
    (
        "base.html.jinja",
        include_str!("../../../templates/emails/base.html.jinja"),
    ),
    (
        "verification.html.jinja",
        include_str!("../../../templates/emails/verification.html.jinja"),
    ),
    (
        "password_reset.html.jinja",
        include_str!("../../../templates/emails/password_reset.html.jinja"),
    ),
    (
        "report_status.html.jinja",
        include_str!("../../../templates/emails/report_status.html.jinja"),
    ),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template environment failed to load: {0}")]
    Load(String),

    #[error("Failed to render template '{0}': {1}")]
    Render(String, String),
}

fn build_environment() -> Result<Environment<'static>, String> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|name| {
        if name.ends_with(".html.jinja") {
            AutoEscape::Html
        } else {
            AutoEscape::None
        }
    });
    for (name, source) in TEMPLATES {
        env.add_template(name, source)
            .map_err(|e| format!("{}: {}", name, e))?;
    }
    Ok(env)
}

fn environment() -> Result<&'static Environment<'static>, TemplateError> {
    TEMPLATE_ENV
        .get_or_init(build_environment)
        .as_ref()
        .map_err(|e| TemplateError::Load(e.clone()))
}

pub fn render(name: &str, ctx: Value) -> Result<String, TemplateError> {
    environment()?
        .get_template(name)
        .and_then(|template| template.render(ctx))
        .map_err(|e| TemplateError::Render(name.to_string(), e.to_string()))
}
