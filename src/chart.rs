use chrono::NaiveDate;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{DateLabelError, ReportError, Result};
use crate::report::Visitors;

/// Format of the `Data` label on visitors entries, e.g. `20180610`.
pub const DATE_LABEL_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YAxisSide {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub show: bool,
}

impl Axis {
    pub fn shown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            show: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
    pub y_axis: YAxisSide,
}

/// A line chart over a shared date axis with up to two value axes.
///
/// `width`/`height` of `None` leave sizing to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub padding: Padding,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub y_axis_secondary: Axis,
    pub series: Vec<TimeSeries>,
}

impl Chart {
    pub fn series_on(&self, side: YAxisSide) -> impl Iterator<Item = &TimeSeries> {
        self.series.iter().filter(move |s| s.y_axis == side)
    }
}

fn base_chart() -> Chart {
    Chart {
        width: None,
        height: None,
        padding: Padding {
            top: 40.0,
            left: 80.0,
            ..Padding::default()
        },
        x_axis: Axis::shown("Date"),
        y_axis: Axis::shown("Visitors"),
        y_axis_secondary: Axis::shown("Hits"),
        series: Vec::new(),
    }
}

/// Parse a `YYYYMMDD` label: exactly 8 ASCII digits forming a calendar date.
pub fn parse_date_label(label: &str) -> std::result::Result<NaiveDate, DateLabelError> {
    if label.len() != 8 || !label.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateLabelError::Shape);
    }
    Ok(NaiveDate::parse_from_str(label, DATE_LABEL_FORMAT)?)
}

/// Build the visitors/hits chart. Entries keep their input order.
pub fn build_visitors_chart(visitors: &Visitors) -> Result<Chart> {
    let start_time = Instant::now();

    let mut visitor_points = Vec::with_capacity(visitors.data.len());
    let mut hit_points = Vec::with_capacity(visitors.data.len());

    for (index, point) in visitors.data.iter().enumerate() {
        let date = parse_date_label(&point.data).map_err(|source| ReportError::DateParse {
            index,
            value: point.data.clone(),
            source,
        })?;
        debug!(action = "parse", component = "chart_builder", index, %date, "Parsed date label");

        visitor_points.push((date, point.visitors.count));
        hit_points.push((date, point.hits.count));
    }

    let mut chart = base_chart();
    chart.series = vec![
        TimeSeries {
            name: "Visitors".to_string(),
            points: visitor_points,
            y_axis: YAxisSide::Primary,
        },
        TimeSeries {
            name: "Hits".to_string(),
            points: hit_points,
            y_axis: YAxisSide::Secondary,
        },
    ];

    info!(
        action = "build",
        component = "chart_builder",
        point_count = visitors.data.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Built visitors chart"
    );
    Ok(chart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CountPercent, SeriesPoint};

    fn point(date: &str, visitors: f64, hits: f64) -> SeriesPoint {
        SeriesPoint {
            hits: CountPercent {
                count: hits,
                percent: 0.0,
            },
            visitors: CountPercent {
                count: visitors,
                percent: 0.0,
            },
            data: date.to_string(),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_compact_date_labels() {
        assert_eq!(parse_date_label("20180610").unwrap(), ymd(2018, 6, 10));
        assert!(parse_date_label("2018-06-10").is_err());
        assert!(parse_date_label("").is_err());
        assert!(matches!(
            parse_date_label("20181301"),
            Err(DateLabelError::Calendar(_))
        ));
        assert!(matches!(
            parse_date_label("20180230"),
            Err(DateLabelError::Calendar(_))
        ));
    }

    #[test]
    fn rejects_labels_that_are_not_eight_digits() {
        for label in [
            "2018061",
            "2018111",
            "2018 6 1",
            " 20180610",
            "20180610 ",
            "201806100",
            "2018061a",
            "+2018061",
        ] {
            assert!(
                matches!(parse_date_label(label), Err(DateLabelError::Shape)),
                "{:?} should be rejected",
                label
            );
        }
    }

    #[test]
    fn short_label_aborts_the_chart() {
        let visitors = Visitors {
            data: vec![point("20180101", 1.0, 1.0), point("2018061", 1.0, 1.0)],
            ..Visitors::default()
        };
        assert!(matches!(
            build_visitors_chart(&visitors),
            Err(ReportError::DateParse { index: 1, .. })
        ));
    }

    #[test]
    fn builds_both_series_on_shared_dates() {
        let visitors = Visitors {
            data: vec![point("20180101", 5.0, 10.0), point("20180102", 8.0, 20.0)],
            ..Visitors::default()
        };
        let chart = build_visitors_chart(&visitors).unwrap();

        let primary: Vec<_> = chart.series_on(YAxisSide::Primary).collect();
        let secondary: Vec<_> = chart.series_on(YAxisSide::Secondary).collect();
        assert_eq!(primary.len(), 1);
        assert_eq!(secondary.len(), 1);
        assert_eq!(
            primary[0].points,
            vec![(ymd(2018, 1, 1), 5.0), (ymd(2018, 1, 2), 8.0)]
        );
        assert_eq!(
            secondary[0].points,
            vec![(ymd(2018, 1, 1), 10.0), (ymd(2018, 1, 2), 20.0)]
        );
    }

    #[test]
    fn keeps_input_order_without_sorting_or_dedup() {
        let visitors = Visitors {
            data: vec![
                point("20180105", 1.0, 2.0),
                point("20180101", 3.0, 4.0),
                point("20180101", 5.0, 6.0),
            ],
            ..Visitors::default()
        };
        let chart = build_visitors_chart(&visitors).unwrap();

        for series in &chart.series {
            assert_eq!(series.points.len(), 3);
            let dates: Vec<_> = series.points.iter().map(|(d, _)| *d).collect();
            assert_eq!(dates, vec![ymd(2018, 1, 5), ymd(2018, 1, 1), ymd(2018, 1, 1)]);
        }
    }

    #[test]
    fn configures_axes_and_padding() {
        let chart = build_visitors_chart(&Visitors::default()).unwrap();

        assert_eq!(chart.x_axis, Axis::shown("Date"));
        assert_eq!(chart.y_axis, Axis::shown("Visitors"));
        assert_eq!(chart.y_axis_secondary, Axis::shown("Hits"));
        assert_eq!(chart.padding.top, 40.0);
        assert_eq!(chart.padding.left, 80.0);
        assert_eq!(chart.width, None);
        assert_eq!(chart.height, None);
    }

    #[test]
    fn empty_series_builds_two_empty_series() {
        let chart = build_visitors_chart(&Visitors::default()).unwrap();
        assert_eq!(chart.series.len(), 2);
        assert!(chart.series.iter().all(|s| s.points.is_empty()));
    }

    #[test]
    fn bad_label_reports_index_and_value() {
        let visitors = Visitors {
            data: vec![point("20180101", 1.0, 1.0), point("2018-01-02", 1.0, 1.0)],
            ..Visitors::default()
        };
        match build_visitors_chart(&visitors) {
            Err(ReportError::DateParse { index, value, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(value, "2018-01-02");
            }
            other => panic!("expected DateParse error, got {:?}", other),
        }
    }
}
