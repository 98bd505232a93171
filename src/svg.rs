//! SVG rendering and minification of a [`Chart`].

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::fmt::Write;
use std::time::Instant;
use tracing::info;

use crate::chart::{Chart, TimeSeries, YAxisSide};
use crate::error::{ReportError, Result};
use crate::template::Markup;
use crate::utils::{escape_html, format_tick};

const DEFAULT_WIDTH: u32 = 1024;
const DEFAULT_HEIGHT: u32 = 400;

const TICK_COUNT: usize = 5;
const DATE_TICK_FORMAT: &str = "%Y-%m-%d";

// Room below the plot for date labels and the axis name.
const X_AXIS_GUTTER: f64 = 50.0;
// Room right of the plot for the secondary axis.
const SECONDARY_GUTTER: f64 = 70.0;

const FONT: &str = "font-family=\"Arial, sans-serif\" font-size=\"11\"";
const AXIS_COLOR: &str = "rgb(51,51,51)";
const GRID_COLOR: &str = "rgb(230,230,230)";
const PRIMARY_COLOR: &str = "rgb(0,116,217)";
const SECONDARY_COLOR: &str = "rgb(0,217,101)";

#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    /// `None` when there are no values. Flat ranges are widened by one unit.
    fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut range: Option<Range> = None;
        for v in values {
            range = Some(match range {
                None => Range { min: v, max: v },
                Some(r) => Range {
                    min: r.min.min(v),
                    max: r.max.max(v),
                },
            });
        }
        range.map(|r| {
            if (r.max - r.min).abs() < f64::EPSILON {
                Range {
                    min: r.min,
                    max: r.min + 1.0,
                }
            } else {
                r
            }
        })
    }

    fn translate(&self, value: f64, from_px: f64, to_px: f64) -> f64 {
        from_px + (value - self.min) / (self.max - self.min) * (to_px - from_px)
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        (0..=TICK_COUNT)
            .map(move |i| self.min + (self.max - self.min) * i as f64 / TICK_COUNT as f64)
    }
}

struct PlotArea {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn value_range<'a>(series: impl Iterator<Item = &'a TimeSeries>) -> Option<Range> {
    Range::from_values(series.flat_map(|s| s.points.iter().map(|(_, v)| *v)))
}

/// Compact coordinate: two decimals at most, no trailing zeros.
fn num(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn markup_err(err: std::fmt::Error) -> ReportError {
    ReportError::Markup(format!("formatting failed: {}", err))
}

/// Render `chart` as a standalone SVG document.
pub fn render_svg(chart: &Chart) -> Result<String> {
    let width = f64::from(chart.width.unwrap_or(DEFAULT_WIDTH));
    let height = f64::from(chart.height.unwrap_or(DEFAULT_HEIGHT));
    let pad = chart.padding;

    let plot = PlotArea {
        left: pad.left,
        right: width - pad.right - SECONDARY_GUTTER,
        top: pad.top,
        bottom: height - pad.bottom - X_AXIS_GUTTER,
    };
    if plot.right <= plot.left || plot.bottom <= plot.top {
        return Err(ReportError::Markup(format!(
            "canvas {}x{} leaves no room for the plot",
            width, height
        )));
    }

    let x_range = Range::from_values(
        chart
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|(d, _)| day_number(*d))),
    );
    let primary = value_range(chart.series_on(YAxisSide::Primary));
    let secondary = value_range(chart.series_on(YAxisSide::Secondary));

    let mut out = String::new();
    write_document(&mut out, chart, &plot, width, height, x_range, primary, secondary)
        .map_err(markup_err)?;
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn write_document(
    out: &mut String,
    chart: &Chart,
    plot: &PlotArea,
    width: f64,
    height: f64,
    x_range: Option<Range>,
    primary: Option<Range>,
    secondary: Option<Range>,
) -> std::fmt::Result {
    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = num(width),
        h = num(height)
    )?;
    writeln!(out, "  <!-- visitors and hits per day -->")?;
    writeln!(
        out,
        "  <desc>{} and {} by {}</desc>",
        escape_html(&chart.y_axis.name),
        escape_html(&chart.y_axis_secondary.name),
        escape_html(&chart.x_axis.name)
    )?;
    writeln!(
        out,
        "  <rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"rgb(255,255,255)\" />",
        num(width),
        num(height)
    )?;

    if chart.y_axis.show {
        if let Some(range) = primary {
            for tick in range.ticks() {
                let y = range.translate(tick, plot.bottom, plot.top);
                writeln!(
                    out,
                    "  <line x1=\"{}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" stroke=\"{}\" stroke-width=\"1\" />",
                    num(plot.left),
                    num(plot.right),
                    GRID_COLOR,
                    y = num(y)
                )?;
            }
        }
    }

    if let Some(x_range) = x_range {
        for series in &chart.series {
            let (range, color) = match series.y_axis {
                YAxisSide::Primary => (primary, PRIMARY_COLOR),
                YAxisSide::Secondary => (secondary, SECONDARY_COLOR),
            };
            if let Some(range) = range {
                write_series(out, series, plot, x_range, range, color)?;
            }
        }
    }

    if chart.x_axis.show {
        writeln!(
            out,
            "  <line x1=\"{}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" stroke=\"{}\" stroke-width=\"1\" />",
            num(plot.left),
            num(plot.right),
            AXIS_COLOR,
            y = num(plot.bottom)
        )?;
        if let Some(range) = x_range {
            let mut last_label = None;
            for tick in range.ticks() {
                let Some(date) = NaiveDate::from_num_days_from_ce_opt(tick.round() as i32) else {
                    continue;
                };
                if last_label == Some(date) {
                    continue;
                }
                last_label = Some(date);
                let x = range.translate(day_number(date), plot.left, plot.right);
                writeln!(
                    out,
                    "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" fill=\"{}\" {}>{}</text>",
                    num(x),
                    num(plot.bottom + 16.0),
                    AXIS_COLOR,
                    FONT,
                    date.format(DATE_TICK_FORMAT)
                )?;
            }
        }
        writeln!(
            out,
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" fill=\"{}\" {}>{}</text>",
            num((plot.left + plot.right) / 2.0),
            num(plot.bottom + X_AXIS_GUTTER - 12.0),
            AXIS_COLOR,
            FONT,
            escape_html(&chart.x_axis.name)
        )?;
    }

    if chart.y_axis.show {
        write_y_axis(out, &chart.y_axis.name, primary, plot, plot.left, -1.0)?;
    }
    if chart.y_axis_secondary.show {
        write_y_axis(
            out,
            &chart.y_axis_secondary.name,
            secondary,
            plot,
            plot.right,
            1.0,
        )?;
    }

    writeln!(out, "</svg>")
}

fn write_series(
    out: &mut String,
    series: &TimeSeries,
    plot: &PlotArea,
    x_range: Range,
    y_range: Range,
    color: &str,
) -> std::fmt::Result {
    let coords: Vec<(f64, f64)> = series
        .points
        .iter()
        .map(|(date, value)| {
            (
                x_range.translate(day_number(*date), plot.left, plot.right),
                y_range.translate(*value, plot.bottom, plot.top),
            )
        })
        .collect();

    match coords.as_slice() {
        [] => Ok(()),
        [(x, y)] => writeln!(
            out,
            "  <circle cx=\"{}\" cy=\"{}\" r=\"3\" fill=\"{}\" />",
            num(*x),
            num(*y),
            color
        ),
        _ => {
            let mut d = String::new();
            for (i, (x, y)) in coords.iter().enumerate() {
                let cmd = if i == 0 { 'M' } else { 'L' };
                write!(d, "{}{} {}", cmd, num(*x), num(*y))?;
            }
            writeln!(
                out,
                "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\" />",
                d, color
            )
        }
    }
}

/// `direction` is -1 for an axis drawn left of the plot and 1 for the right.
fn write_y_axis(
    out: &mut String,
    name: &str,
    range: Option<Range>,
    plot: &PlotArea,
    x: f64,
    direction: f64,
) -> std::fmt::Result {
    let anchor = if direction < 0.0 { "end" } else { "start" };

    writeln!(
        out,
        "  <line x1=\"{x}\" y1=\"{}\" x2=\"{x}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"1\" />",
        num(plot.top),
        num(plot.bottom),
        AXIS_COLOR,
        x = num(x)
    )?;
    if let Some(range) = range {
        for tick in range.ticks() {
            let y = range.translate(tick, plot.bottom, plot.top);
            writeln!(
                out,
                "  <text x=\"{}\" y=\"{}\" text-anchor=\"{}\" fill=\"{}\" {}>{}</text>",
                num(x + direction * 8.0),
                num(y + 4.0),
                anchor,
                AXIS_COLOR,
                FONT,
                format_tick(tick)
            )?;
        }
    }

    let name_x = x + direction * 58.0;
    let name_y = (plot.top + plot.bottom) / 2.0;
    writeln!(
        out,
        "  <text x=\"{nx}\" y=\"{ny}\" text-anchor=\"middle\" fill=\"{}\" {} transform=\"rotate(-90 {nx} {ny})\">{}</text>",
        AXIS_COLOR,
        FONT,
        escape_html(name),
        nx = num(name_x),
        ny = num(name_y)
    )
}

/// Strips what an SVG embedded in HTML does not need.
pub struct Minifier {
    prolog: Regex,
    comments: Regex,
    metadata: Regex,
    whitespace: Regex,
    between_tags: Regex,
    self_closing: Regex,
}

impl Minifier {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                ReportError::Markup(format!("invalid minifier pattern {:?}: {}", pattern, e))
            })
        };
        Ok(Self {
            prolog: compile(r"<\?xml[^>]*\?>")?,
            comments: compile(r"(?s)<!--.*?-->")?,
            metadata: compile(r"(?s)<metadata\b.*?</metadata>|<desc\b.*?</desc>")?,
            whitespace: compile(r"\s+")?,
            between_tags: compile(r">\s+<")?,
            self_closing: compile(r"\s+/>")?,
        })
    }

    pub fn minify(&self, markup: &str) -> Result<String> {
        if !markup.contains("<svg") {
            return Err(ReportError::Markup(
                "minifier input is not SVG markup".to_string(),
            ));
        }
        let out = self.prolog.replace_all(markup, "");
        let out = self.comments.replace_all(&out, "");
        let out = self.metadata.replace_all(&out, "");
        let out = self.whitespace.replace_all(&out, " ");
        let out = self.between_tags.replace_all(&out, "><");
        let out = self.self_closing.replace_all(&out, "/>");
        Ok(out.trim().to_string())
    }
}

/// Render and minify `chart` into markup ready for a template slot.
pub fn chart_as_markup(chart: &Chart) -> Result<Markup> {
    let start_time = Instant::now();

    let svg = render_svg(chart)?;
    let minified = Minifier::new()?.minify(&svg)?;

    info!(
        action = "render",
        component = "markup_serializer",
        svg_bytes = svg.len(),
        minified_bytes = minified.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Rendered chart markup"
    );
    Ok(Markup::trusted(minified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::build_visitors_chart;
    use crate::report::{CountPercent, SeriesPoint, Visitors};

    fn visitors(points: &[(&str, f64, f64)]) -> Visitors {
        Visitors {
            data: points
                .iter()
                .map(|(date, v, h)| SeriesPoint {
                    hits: CountPercent {
                        count: *h,
                        percent: 0.0,
                    },
                    visitors: CountPercent {
                        count: *v,
                        percent: 0.0,
                    },
                    data: date.to_string(),
                })
                .collect(),
            ..Visitors::default()
        }
    }

    #[test]
    fn renders_axes_and_both_series() {
        let chart =
            build_visitors_chart(&visitors(&[("20180101", 5.0, 10.0), ("20180102", 8.0, 20.0)]))
                .unwrap();
        let svg = render_svg(&chart).unwrap();

        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(">Date</text>"));
        assert!(svg.contains(">Visitors</text>"));
        assert!(svg.contains(">Hits</text>"));
        assert!(svg.contains(">2018-01-01</text>"));
        assert!(svg.contains(">2018-01-02</text>"));
        assert!(svg.contains(&format!("stroke=\"{}\"", PRIMARY_COLOR)));
        assert!(svg.contains(&format!("stroke=\"{}\"", SECONDARY_COLOR)));
        assert_eq!(svg.matches("<path").count(), 2);
    }

    #[test]
    fn series_span_the_plot_area() {
        let chart =
            build_visitors_chart(&visitors(&[("20180101", 5.0, 10.0), ("20180102", 8.0, 20.0)]))
                .unwrap();
        let svg = render_svg(&chart).unwrap();

        // Default canvas is 1024x400; plot runs from x=80 to x=954, y=40 to y=350.
        assert!(svg.contains("d=\"M80 350L954 40\""));
    }

    #[test]
    fn hidden_axis_is_not_drawn() {
        let mut chart = build_visitors_chart(&visitors(&[("20180101", 1.0, 2.0)])).unwrap();
        chart.y_axis_secondary.show = false;
        let svg = render_svg(&chart).unwrap();
        assert!(!svg.contains(">Hits</text>"));
        assert!(svg.contains(">Visitors</text>"));
    }

    #[test]
    fn single_point_and_flat_values_render() {
        let chart = build_visitors_chart(&visitors(&[("20180101", 3.0, 3.0)])).unwrap();
        let svg = render_svg(&chart).unwrap();
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("inf"));
    }

    #[test]
    fn empty_chart_still_serializes() {
        let chart = build_visitors_chart(&Visitors::default()).unwrap();
        let markup = chart_as_markup(&chart).unwrap();
        assert!(markup.as_str().starts_with("<svg"));
        assert!(markup.as_str().ends_with("</svg>"));
        assert!(!markup.as_str().contains("<path"));
    }

    #[test]
    fn markup_is_deterministic() {
        let chart = build_visitors_chart(&visitors(&[
            ("20180101", 5.0, 10.0),
            ("20180102", 8.0, 20.0),
            ("20180103", 2.5, 7.0),
        ]))
        .unwrap();
        assert_eq!(
            chart_as_markup(&chart).unwrap(),
            chart_as_markup(&chart).unwrap()
        );
    }

    #[test]
    fn minifier_strips_insignificant_content() {
        let minifier = Minifier::new().unwrap();
        let input = "<?xml version=\"1.0\"?>\n<svg>\n  <!-- note -->\n  <desc>about</desc>\n  <metadata><x/></metadata>\n  <rect  x=\"1\"\n   />\n  <text>a  b</text>\n</svg>\n";
        assert_eq!(
            minifier.minify(input).unwrap(),
            "<svg><rect x=\"1\"/><text>a b</text></svg>"
        );
    }

    #[test]
    fn minifier_shrinks_rendered_chart() {
        let chart = build_visitors_chart(&visitors(&[("20180101", 5.0, 10.0)])).unwrap();
        let svg = render_svg(&chart).unwrap();
        let minified = Minifier::new().unwrap().minify(&svg).unwrap();
        assert!(minified.len() < svg.len());
        assert!(!minified.contains('\n'));
        assert!(!minified.contains("<desc"));
        assert_eq!(Minifier::new().unwrap().minify(&minified).unwrap(), minified);
    }

    #[test]
    fn minifier_rejects_non_svg() {
        let err = Minifier::new().unwrap().minify("<html></html>").unwrap_err();
        assert!(matches!(err, ReportError::Markup(_)));
    }

    #[test]
    fn num_is_compact() {
        assert_eq!(num(80.0), "80");
        assert_eq!(num(12.5), "12.5");
        assert_eq!(num(1.0 / 3.0), "0.33");
        assert_eq!(num(-0.001), "0");
    }
}
