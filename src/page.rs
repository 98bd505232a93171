use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::error::Result;
use crate::{chart, report, svg, template};

/// Run the whole conversion in memory: report JSON in, HTML page out.
///
/// Nothing is written anywhere; callers emit the page only after this
/// returns `Ok`, so a failure never produces a truncated document.
pub fn render_page<R: Read>(input: R, template_path: Option<&Path>) -> Result<String> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "page", "Starting report conversion");

    let report = report::decode_reader(input)?;
    let chart = chart::build_visitors_chart(&report.visitors)?;
    let markup = svg::chart_as_markup(&chart)?;

    let page_template = template::load_template(template_path)?;
    let ctx = template::TemplateContext::new(&report, markup);
    let page = page_template.render(&ctx)?;

    info!(
        action = "complete",
        component = "page",
        page_bytes = page.len(),
        duration_ms = total_start_time.elapsed().as_millis(),
        "Report conversion completed"
    );
    Ok(page)
}
