use anyhow::Context;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::error::{ReportError, Result};
use crate::report::Report;
use crate::utils::escape_html;

// Embedded fallback template
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/default.html");

pub const DEFAULT_TEMPLATE_FILE: &str = "template.html";

// `{{ Name }}`, also accepting the `{{.Name}}` spelling.
const SLOT_PATTERN: &str = r"\{\{\s*\.?([A-Za-z][A-Za-z0-9_]*)\s*\}\}";

/// HTML that is already safe to embed and must not be escaped again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    pub fn trusted(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values bound to template slots. Only `Visitors` is inserted verbatim.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub visitors: Markup,
    pub start_date: String,
    pub end_date: String,
    pub date_time: String,
    pub total_requests: i64,
}

impl TemplateContext {
    pub fn new(report: &Report, visitors: Markup) -> Self {
        Self {
            visitors,
            start_date: report.general.start_date.clone(),
            end_date: report.general.end_date.clone(),
            date_time: report.general.date_time.clone(),
            total_requests: report.general.total_requests,
        }
    }

    fn lookup(&self, slot: &str) -> Option<Cow<'_, str>> {
        match slot {
            "Visitors" => Some(Cow::Borrowed(self.visitors.as_str())),
            "StartDate" => Some(Cow::Owned(escape_html(&self.start_date))),
            "EndDate" => Some(Cow::Owned(escape_html(&self.end_date))),
            "DateTime" => Some(Cow::Owned(escape_html(&self.date_time))),
            "TotalRequests" => Some(Cow::Owned(self.total_requests.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    source: String,
}

impl Template {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render into memory. Fails on the first slot the context does not know.
    pub fn render(&self, ctx: &TemplateContext) -> Result<String> {
        let slot = Regex::new(SLOT_PATTERN)
            .map_err(|e| ReportError::Template(format!("invalid slot pattern: {}", e)))?;

        let mut out = String::with_capacity(self.source.len() + ctx.visitors.as_str().len());
        let mut last = 0;
        for caps in slot.captures_iter(&self.source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = ctx.lookup(name.as_str()).ok_or_else(|| {
                ReportError::Template(format!(
                    "{}: unknown slot {:?} at byte {}",
                    self.name,
                    name.as_str(),
                    whole.start()
                ))
            })?;
            out.push_str(&self.source[last..whole.start()]);
            out.push_str(&value);
            last = whole.end();
        }
        out.push_str(&self.source[last..]);
        Ok(out)
    }
}

fn read_template(path: &Path) -> Result<Template> {
    let source = fs::read_to_string(path).map_err(|source| ReportError::TemplateIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Template::new(path.display().to_string(), source))
}

/// Resolve the page template: explicit path, then `template.html`, then the
/// embedded default.
pub fn load_template(template_path: Option<&Path>) -> Result<Template> {
    let start_time = Instant::now();

    let template = if let Some(path) = template_path {
        info!(action = "load", component = "template_file", file_path = ?path, "Loading template from specified file");
        if !path.exists() {
            return Err(ReportError::Template(format!(
                "Template file not found: {:?}",
                path
            )));
        }
        read_template(path)?
    } else {
        let default_file = Path::new(DEFAULT_TEMPLATE_FILE);
        if default_file.exists() {
            info!(action = "load", component = "default_template_file", file_path = ?default_file, "Loading template from default file");
            read_template(default_file)?
        } else {
            info!(
                action = "load",
                component = "embedded_template",
                "Using embedded default template"
            );
            Template::new("embedded default template", DEFAULT_TEMPLATE)
        }
    };

    info!(
        action = "complete",
        component = "template_loading",
        template = template.name(),
        duration_ms = start_time.elapsed().as_millis(),
        "Template loaded"
    );
    Ok(template)
}

/// Write the embedded template to disk so it can be customized.
pub fn init_default_template(path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let target = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_FILE));

    if target.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            target.display()
        );
    }

    fs::write(&target, DEFAULT_TEMPLATE)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    println!("Created {} with the default template", target.display());

    Ok(target)
}
