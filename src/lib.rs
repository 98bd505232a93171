pub mod args;
pub mod chart;
pub mod error;
pub mod page;
pub mod report;
pub mod svg;
pub mod template;
pub mod utils;

pub use args::Args;
pub use chart::{build_visitors_chart, Chart};
pub use error::ReportError;
pub use page::render_page;
pub use report::{decode, Report};
pub use svg::chart_as_markup;
pub use template::{init_default_template, Markup};
