use crate::model::BoxStats;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

/// Pixel size of every rendered chart
pub const CHART_SIZE: (u32, u32) = (1500, 900);

const FONT: &str = "sans-serif";
const TITLE_FONT_SIZE: u32 = 32;
const LABEL_FONT_SIZE: u32 = 20;
const ANNOTATION_FONT_SIZE: u32 = 16;
const STROKE_WIDTH: u32 = 2;
/// Space left above the tallest element
const HEADROOM: f64 = 1.15;

const NATIVE: RGBColor = RGBColor(0x2C, 0xA0, 0x2C);
const DOCKER: RGBColor = RGBColor(0x24, 0x96, 0xED);
const WASMTIME: RGBColor = RGBColor(0xFF, 0x6B, 0x35);
const WASMEDGE: RGBColor = RGBColor(0x6F, 0x42, 0xC1);
const WASMCLOUD: RGBColor = RGBColor(0x00, 0xC3, 0x89);
const WASMCLOUD_COMPONENT: RGBColor = RGBColor(0x8C, 0x56, 0x4B);
const OTHER: RGBColor = RGBColor(0x7F, 0x7F, 0x7F);

/// The color a runtime is drawn in, the same on every chart.
pub fn runtime_color(runtime: &str) -> RGBColor {
    match runtime {
        "native" => NATIVE,
        "docker" => DOCKER,
        "wasmtime" | "wasm" => WASMTIME,
        "wasmedge" => WASMEDGE,
        "wasmcloud_full" | "wasmcloud" => WASMCLOUD,
        "wasmcloud_comp" => WASMCLOUD_COMPONENT,
        _ => OTHER,
    }
}

/// A value with an optional symmetric error, drawn as an error bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measure {
    pub value: f64,
    pub error: Option<f64>,
}

impl Measure {
    pub fn new(value: f64) -> Self {
        Self { value, error: None }
    }

    pub fn with_error(value: f64, error: f64) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    fn top(&self) -> f64 {
        self.value + self.error.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct Bar {
    pub label: String,
    pub color: RGBColor,
    pub measure: Measure,
}

/// One named series across the categories of a grouped or stacked bar chart.
///
/// `measures` has one entry per category, [None] where the series has no data.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub name: String,
    pub color: RGBColor,
    pub measures: Vec<Option<Measure>>,
}

#[derive(Debug, Clone)]
pub struct Line {
    pub name: String,
    pub color: RGBColor,
    pub points: Vec<(f64, Measure)>,
}

/// A horizontal line across the whole chart
#[derive(Debug, Clone)]
pub struct Reference {
    pub label: String,
    pub value: f64,
}

fn label_style() -> TextStyle<'static> {
    TextStyle::from((FONT, LABEL_FONT_SIZE).into_font()).pos(Pos::new(HPos::Center, VPos::Top))
}

fn annotation_style() -> TextStyle<'static> {
    TextStyle::from((FONT, ANNOTATION_FONT_SIZE).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom))
}

fn y_upper(max: f64) -> f64 {
    if max > 0.0 && max.is_finite() {
        max * HEADROOM
    } else {
        1.0
    }
}

/// One bar per runtime with value annotations and optional error bars.
pub fn bar_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    bars: &[Bar],
    reference: Option<&Reference>,
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = bars.len() as f64;
    let y_max = y_upper(
        bars.iter()
            .map(|bar| bar.measure.top())
            .chain(reference.map(|r| r.value))
            .fold(0.0, f64::max),
    );
    // Negative values, such as a negative overhead, extend the axis below zero
    let y_min = bars
        .iter()
        .map(|bar| bar.measure.value - bar.measure.error.unwrap_or(0.0))
        .fold(0.0, f64::min)
        * HEADROOM;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .y_desc(y_desc)
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        let x = i as f64;
        Rectangle::new(
            [(x + 0.15, 0.0), (x + 0.85, bar.measure.value)],
            bar.color.filled(),
        )
    }))?;

    chart.draw_series(bars.iter().enumerate().filter_map(|(i, bar)| {
        bar.measure.error.map(|error| {
            ErrorBar::new_vertical(
                i as f64 + 0.5,
                bar.measure.value - error,
                bar.measure.value,
                bar.measure.value + error,
                BLACK.stroke_width(STROKE_WIDTH),
                20,
            )
        })
    }))?;

    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        Text::new(
            format!("{:.2}", bar.measure.value),
            (i as f64 + 0.5, bar.measure.top()),
            annotation_style(),
        )
    }))?;

    if let Some(reference) = reference {
        draw_reference(&mut chart, reference, x_max)?;
    }

    for (i, bar) in bars.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(i as f64 + 0.5, y_min));
        root.draw(&Text::new(bar.label.clone(), (x, y + 10), label_style()))?;
    }

    root.present()?;
    Ok(())
}

/// Side by side bars for each category, one bar per series.
pub fn grouped_bar_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    categories: &[String],
    series: &[BarSeries],
    reference: Option<&Reference>,
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = categories.len() as f64;
    let y_max = y_upper(
        series
            .iter()
            .flat_map(|s| s.measures.iter().flatten())
            .map(Measure::top)
            .chain(reference.map(|r| r.value))
            .fold(0.0, f64::max),
    );
    let width = 0.8 / series.len().max(1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .y_desc(y_desc)
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    for (s, bar_series) in series.iter().enumerate() {
        let offset = 0.1 + s as f64 * width;
        let color = bar_series.color;
        let placed = bar_series
            .measures
            .iter()
            .enumerate()
            .filter_map(|(c, m)| m.map(|m| (c as f64 + offset, m)))
            .collect::<Vec<_>>();

        chart
            .draw_series(placed.iter().map(|(x, m)| {
                Rectangle::new([(*x, 0.0), (*x + width, m.value)], color.filled())
            }))?
            .label(bar_series.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled()));

        chart.draw_series(placed.iter().filter_map(|(x, m)| {
            m.error.map(|error| {
                ErrorBar::new_vertical(
                    *x + width / 2.0,
                    m.value - error,
                    m.value,
                    m.value + error,
                    BLACK.stroke_width(STROKE_WIDTH),
                    10,
                )
            })
        }))?;

        chart.draw_series(placed.iter().map(|(x, m)| {
            Text::new(
                format!("{:.1}", m.value),
                (*x + width / 2.0, m.top()),
                annotation_style(),
            )
        }))?;
    }

    if let Some(reference) = reference {
        draw_reference(&mut chart, reference, x_max)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_FONT_SIZE))
        .draw()?;

    for (c, category) in categories.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(c as f64 + 0.5, 0.0));
        root.draw(&Text::new(category.clone(), (x, y + 10), label_style()))?;
    }

    root.present()?;
    Ok(())
}

/// Bars made of stacked layers, with the total written above each bar.
pub fn stacked_bar_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    categories: &[String],
    layers: &[BarSeries],
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let totals = (0..categories.len())
        .map(|c| {
            layers
                .iter()
                .filter_map(|layer| layer.measures.get(c).copied().flatten())
                .map(|m| m.value)
                .sum::<f64>()
        })
        .collect::<Vec<_>>();

    let x_max = categories.len() as f64;
    let y_max = y_upper(totals.iter().copied().fold(0.0, f64::max));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .y_desc(y_desc)
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    let mut bottoms = vec![0.0; categories.len()];
    for layer in layers {
        let color = layer.color;
        let mut rects = Vec::new();
        for (c, measure) in layer.measures.iter().enumerate() {
            if let (Some(measure), Some(bottom)) = (measure, bottoms.get_mut(c)) {
                let x = c as f64;
                rects.push(Rectangle::new(
                    [(x + 0.2, *bottom), (x + 0.8, *bottom + measure.value)],
                    color.filled(),
                ));
                *bottom += measure.value;
            }
        }

        chart
            .draw_series(rects)?
            .label(layer.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled()));
    }

    chart.draw_series(totals.iter().enumerate().map(|(c, total)| {
        Text::new(
            format!("{total:.0}"),
            (c as f64 + 0.5, *total),
            annotation_style(),
        )
    }))?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_FONT_SIZE))
        .draw()?;

    for (c, category) in categories.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(c as f64 + 0.5, 0.0));
        root.draw(&Text::new(category.clone(), (x, y + 10), label_style()))?;
    }

    root.present()?;
    Ok(())
}

/// Box plots with outliers as hollow circles and the mean as a red dot.
pub fn box_plot(
    path: &Path,
    title: &str,
    y_desc: &str,
    boxes: &[(String, RGBColor, BoxStats)],
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (low, high) = boxes
        .iter()
        .flat_map(|(_, _, stats)| {
            stats
                .outliers
                .iter()
                .copied()
                .chain([stats.lower_whisker, stats.upper_whisker])
        })
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), v| {
            (low.min(v), high.max(v))
        });
    let (y_min, y_max) = if low.is_finite() && high.is_finite() {
        let pad = ((high - low) * 0.05).max(1e-3);
        ((low - pad).max(0.0), high + pad)
    } else {
        (0.0, 1.0)
    };
    let x_max = boxes.len() as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .y_desc(y_desc)
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    for (i, (_, color, stats)) in boxes.iter().enumerate() {
        let left = i as f64 + 0.25;
        let right = i as f64 + 0.75;
        let center = i as f64 + 0.5;
        let line = BLACK.stroke_width(STROKE_WIDTH);

        chart.draw_series([
            Rectangle::new([(left, stats.q1), (right, stats.q3)], color.mix(0.6).filled()),
            Rectangle::new([(left, stats.q1), (right, stats.q3)], line),
        ])?;
        chart.draw_series([
            PathElement::new(vec![(left, stats.median), (right, stats.median)], line),
            PathElement::new(vec![(center, stats.q3), (center, stats.upper_whisker)], line),
            PathElement::new(vec![(center, stats.q1), (center, stats.lower_whisker)], line),
            PathElement::new(
                vec![
                    (center - 0.1, stats.upper_whisker),
                    (center + 0.1, stats.upper_whisker),
                ],
                line,
            ),
            PathElement::new(
                vec![
                    (center - 0.1, stats.lower_whisker),
                    (center + 0.1, stats.lower_whisker),
                ],
                line,
            ),
        ])?;
        chart.draw_series(
            stats
                .outliers
                .iter()
                .map(|v| Circle::new((center, *v), 4, BLACK.stroke_width(1))),
        )?;
        chart.draw_series(std::iter::once(Circle::new(
            (center, stats.mean),
            6,
            RED.filled(),
        )))?;
    }

    for (i, (label, _, _)) in boxes.iter().enumerate() {
        let (x, y) = chart.backend_coord(&(i as f64 + 0.5, y_min));
        root.draw(&Text::new(label.clone(), (x, y + 10), label_style()))?;
    }

    root.present()?;
    Ok(())
}

/// Lines with circle markers and optional error bars, one per series.
pub fn line_chart(
    path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    lines: &[Line],
    reference: Option<&Reference>,
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_low, x_high) = lines
        .iter()
        .flat_map(|line| line.points.iter().map(|(x, _)| *x))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), x| {
            (low.min(x), high.max(x))
        });
    let (x_min, x_max) = if x_low.is_finite() && x_high.is_finite() {
        let pad = ((x_high - x_low) * 0.05).max(0.5);
        (x_low - pad, x_high + pad)
    } else {
        (0.0, 1.0)
    };
    let y_max = y_upper(
        lines
            .iter()
            .flat_map(|line| line.points.iter().map(|(_, m)| m.top()))
            .chain(reference.map(|r| r.value))
            .fold(0.0, f64::max),
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    for line in lines {
        let color = line.color;
        chart
            .draw_series(LineSeries::new(
                line.points.iter().map(|(x, m)| (*x, m.value)),
                color.stroke_width(STROKE_WIDTH),
            ))?
            .label(line.name.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(STROKE_WIDTH))
            });

        chart.draw_series(
            line.points
                .iter()
                .map(|(x, m)| Circle::new((*x, m.value), 5, color.filled())),
        )?;

        chart.draw_series(line.points.iter().filter_map(|(x, m)| {
            m.error.map(|error| {
                ErrorBar::new_vertical(
                    *x,
                    m.value - error,
                    m.value,
                    m.value + error,
                    color.stroke_width(STROKE_WIDTH),
                    10,
                )
            })
        }))?;
    }

    if let Some(reference) = reference {
        draw_reference(&mut chart, reference, x_max)?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_FONT_SIZE))
        .draw()?;

    root.present()?;
    Ok(())
}

pub fn scatter_chart(
    path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    points: &[(f64, f64)],
) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = points.iter().map(|(x, _)| *x).fold(0.0, f64::max) + 1.0;
    let y_max = y_upper(points.iter().map(|(_, y)| *y).fold(0.0, f64::max));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(-1f64..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .label_style((FONT, LABEL_FONT_SIZE))
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 3, NATIVE.mix(0.6).filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_reference<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    reference: &Reference,
    x_max: f64,
) -> anyhow::Result<()>
where
    DB::ErrorType: 'static,
{
    let x_min = chart.x_range().start;
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(x_min, reference.value), (x_max, reference.value)],
            RED.stroke_width(STROKE_WIDTH),
        )))
        .map_err(|e| anyhow::anyhow!("Failed to draw reference line: {e:?}"))?
        .label(reference.label.as_str())
        .legend(|(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(STROKE_WIDTH))
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtimes_have_stable_colors() {
        assert_eq!(runtime_color("docker"), DOCKER);
        assert_eq!(runtime_color("wasm"), runtime_color("wasmtime"));
        assert_eq!(runtime_color("something-else"), OTHER);
    }

    #[test]
    fn headroom_is_added_above_the_data() {
        assert_eq!(y_upper(0.0), 1.0);
        assert!((y_upper(100.0) - 115.0).abs() < 1e-9);
        assert_eq!(Measure::with_error(10.0, 2.0).top(), 12.0);
        assert_eq!(Measure::new(10.0).top(), 10.0);
    }

    #[test]
    fn reference_line_is_drawn_across_the_chart() -> anyhow::Result<()> {
        let (width, height) = (200, 100);
        let mut buffer = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE)?;
            let mut chart = ChartBuilder::on(&root).build_cartesian_2d(0.0..2.0, 0.0..10.0)?;
            let reference = Reference {
                label: "Parity".to_string(),
                value: 5.0,
            };
            draw_reference(&mut chart, &reference, 2.0)?;
            root.present()?;
        }

        let red_rows = buffer
            .chunks(3)
            .enumerate()
            .filter(|(_, px)| px[0] > 200 && px[1] < 100 && px[2] < 100)
            .map(|(i, _)| i as u32 / width)
            .collect::<std::collections::BTreeSet<_>>();
        assert!(!red_rows.is_empty());
        assert!(red_rows.iter().all(|row| row.abs_diff(height / 2) <= 2));
        Ok(())
    }
}
