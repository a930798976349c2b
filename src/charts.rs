//! Pure SVG chart generation for the customer dashboard.
//!
//! State in, markup out: the handlers pick a chart kind and roll jitter,
//! these functions turn that into path strings and complete `<svg>`
//! fragments. The trend chart is a line over a filled area with dot
//! markers; the pie chart is built from polar-arc segments with a fixed
//! four-color palette.

use serde::Serialize;

use crate::records::DataCategory;

pub const PALETTE: [&str; 4] = ["#0077be", "#00d4aa", "#ff6b35", "#f7931e"];

const TREND_POINTS: usize = 6;
const AREA_BASELINE: f64 = 200.0;
const PIE_CENTER: f64 = 60.0;
const PIE_RADIUS: f64 = 50.0;

/// Selectable metric for the main trend chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendKind {
    Revenue,
    Orders,
    Users,
    Conversion,
}

impl TrendKind {
    pub const ALL: [TrendKind; 4] = [
        TrendKind::Revenue,
        TrendKind::Orders,
        TrendKind::Users,
        TrendKind::Conversion,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "revenue" => Some(TrendKind::Revenue),
            "orders" => Some(TrendKind::Orders),
            "users" => Some(TrendKind::Users),
            "conversion" => Some(TrendKind::Conversion),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendKind::Revenue => "revenue",
            TrendKind::Orders => "orders",
            TrendKind::Users => "users",
            TrendKind::Conversion => "conversion",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TrendKind::Revenue => "Revenue Trend",
            TrendKind::Orders => "Order Volume",
            TrendKind::Users => "User Growth",
            TrendKind::Conversion => "Conversion Rate",
        }
    }

    pub fn base_value(&self) -> f64 {
        match self {
            TrendKind::Revenue => 40_000.0,
            TrendKind::Orders => 300.0,
            TrendKind::Users => 1_200.0,
            TrendKind::Conversion => 85.0,
        }
    }
}

/// Selectable breakdown for the pie chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieKind {
    Traffic,
    Revenue,
    Customers,
    Products,
}

impl PieKind {
    pub const ALL: [PieKind; 4] = [
        PieKind::Traffic,
        PieKind::Revenue,
        PieKind::Customers,
        PieKind::Products,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "traffic" => Some(PieKind::Traffic),
            "revenue" => Some(PieKind::Revenue),
            "customers" => Some(PieKind::Customers),
            "products" => Some(PieKind::Products),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PieKind::Traffic => "traffic",
            PieKind::Revenue => "revenue",
            PieKind::Customers => "customers",
            PieKind::Products => "products",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PieKind::Traffic => "Traffic Sources",
            PieKind::Revenue => "Revenue Sources",
            PieKind::Customers => "Customer Segments",
            PieKind::Products => "Product Performance",
        }
    }

    pub fn labels(&self) -> [&'static str; 4] {
        match self {
            PieKind::Traffic => ["Organic Search", "Direct", "Social Media", "Email"],
            PieKind::Revenue => ["Product Sales", "Services", "Subscriptions", "Other"],
            PieKind::Customers => ["Enterprise", "SMB", "Startup", "Individual"],
            PieKind::Products => ["Product A", "Product B", "Product C", "Product D"],
        }
    }
}

/// One point of the normalized trend series, in 0..100 viewbox units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub x: f64,
    pub y: f64,
}

/// Normalized trend series: a rising curve from the kind's base value,
/// perturbed by one jitter term per point (each in `[0, 1)`). Higher
/// values plot lower on the y axis.
pub fn trend_points(kind: TrendKind, jitter: &[f64; TREND_POINTS]) -> Vec<TrendPoint> {
    let base = kind.base_value();
    (0..TREND_POINTS)
        .map(|i| {
            let value = base * (1.0 + i as f64 * 0.15 + jitter[i] * 0.1);
            TrendPoint {
                x: i as f64 / (TREND_POINTS - 1) as f64 * 100.0,
                y: (100.0 - value / base * 80.0).max(10.0),
            }
        })
        .collect()
}

/// `M x0 y0 L x1 y1 ...` through the series.
pub fn line_path(points: &[TrendPoint]) -> String {
    let mut path = String::new();
    for (i, p) in points.iter().enumerate() {
        let cmd = if i == 0 { "M" } else { "L" };
        path.push_str(&format!("{}{} {} {}", sep(i), cmd, num(p.x), num(p.y)));
    }
    path
}

/// The line path closed down to the baseline for the area fill.
pub fn area_path(points: &[TrendPoint]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };
    let last = points.last().unwrap();

    let mut path = format!("M {} {}", num(first.x), num(AREA_BASELINE));
    for p in points {
        path.push_str(&format!(" L {} {}", num(p.x), num(p.y)));
    }
    path.push_str(&format!(" L {} {} Z", num(last.x), num(AREA_BASELINE)));
    path
}

/// Complete `<svg>` fragment for the trend chart.
pub fn trend_svg(points: &[TrendPoint]) -> String {
    let mut dots = String::new();
    for p in points {
        dots.push_str(&format!(
            "<circle cx=\"{}\" cy=\"{}\" r=\"4\" fill=\"{}\"/>",
            num(p.x),
            num(p.y),
            PALETTE[0],
        ));
    }

    format!(
        concat!(
            "<svg class=\"trend-chart\" viewBox=\"0 0 100 120\" ",
            "preserveAspectRatio=\"none\" xmlns=\"http://www.w3.org/2000/svg\">",
            "<path d=\"{area}\" fill=\"{color}\" fill-opacity=\"0.15\"/>",
            "<path d=\"{line}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"3\"/>",
            "{dots}</svg>",
        ),
        area = area_path(points),
        line = line_path(points),
        color = PALETTE[0],
        dots = dots,
    )
}

/// One rendered pie slice plus its legend entry.
#[derive(Debug, Clone, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub percentage: u32,
    pub color: String,
}

/// Slice percentages for a pie kind: an even split perturbed per category,
/// clamped to at least 5 and rounded. Deliberately not normalized to 100;
/// the arc segments consume whatever total results.
pub fn pie_slices(kind: PieKind, jitter: &[f64; 4]) -> Vec<PieSlice> {
    kind.labels()
        .iter()
        .zip(PALETTE.iter())
        .zip(jitter.iter())
        .map(|((label, color), j)| PieSlice {
            label: label.to_string(),
            percentage: (100.0 / 4.0 + (j - 0.5) * 20.0).max(5.0).round() as u32,
            color: color.to_string(),
        })
        .collect()
}

/// Wedge path from `start_angle` to `end_angle` (degrees, clockwise from
/// 12 o'clock).
pub fn pie_segment_path(start_angle: f64, end_angle: f64) -> String {
    let start = polar_to_cartesian(PIE_CENTER, PIE_CENTER, PIE_RADIUS, end_angle);
    let end = polar_to_cartesian(PIE_CENTER, PIE_CENTER, PIE_RADIUS, start_angle);
    let large_arc = if end_angle - start_angle <= 180.0 { "0" } else { "1" };

    format!(
        "M {cx} {cy} L {sx} {sy} A {r} {r} 0 {large} 0 {ex} {ey} Z",
        cx = num(PIE_CENTER),
        cy = num(PIE_CENTER),
        sx = num(start.0),
        sy = num(start.1),
        r = num(PIE_RADIUS),
        large = large_arc,
        ex = num(end.0),
        ey = num(end.1),
    )
}

fn polar_to_cartesian(cx: f64, cy: f64, radius: f64, angle_degrees: f64) -> (f64, f64) {
    let radians = (angle_degrees - 90.0).to_radians();
    (cx + radius * radians.cos(), cy + radius * radians.sin())
}

/// Complete `<svg>` fragment for the pie chart. Slices sweep clockwise in
/// proportion to their percentage of the slice total.
pub fn pie_svg(slices: &[PieSlice]) -> String {
    let total: u32 = slices.iter().map(|s| s.percentage).sum();
    let total = total.max(1) as f64;

    let mut segments = String::new();
    let mut current_angle = 0.0;
    for slice in slices {
        let sweep = slice.percentage as f64 / total * 360.0;
        segments.push_str(&format!(
            "<path d=\"{}\" fill=\"{}\"/>",
            pie_segment_path(current_angle, current_angle + sweep),
            slice.color,
        ));
        current_angle += sweep;
    }

    format!(
        concat!(
            "<svg class=\"pie-chart\" viewBox=\"0 0 120 120\" ",
            "xmlns=\"http://www.w3.org/2000/svg\">{}</svg>",
        ),
        segments,
    )
}

fn sep(i: usize) -> &'static str {
    if i == 0 { "" } else { " " }
}

/// Coordinates formatted to two decimals with trailing zeros trimmed.
fn num(value: f64) -> String {
    let text = format!("{value:.2}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_points_are_deterministic_and_clamped() {
        let jitter = [0.0; 6];
        let points = trend_points(TrendKind::Revenue, &jitter);
        assert_eq!(points, trend_points(TrendKind::Revenue, &jitter));

        assert_eq!(points.len(), 6);
        assert_eq!(points[0].x, 0.0);
        assert_eq!(points[5].x, 100.0);
        // First point sits at the base value: y = 100 - 80 = 20.
        assert_eq!(points[0].y, 20.0);
        // Later points rise (smaller y), clamped at the 10 ceiling.
        assert!(points[5].y <= points[0].y);
        assert!(points.iter().all(|p| p.y >= 10.0));
    }

    #[test]
    fn test_path_strings() {
        let points = vec![
            TrendPoint { x: 0.0, y: 20.0 },
            TrendPoint { x: 50.0, y: 15.5 },
            TrendPoint { x: 100.0, y: 10.0 },
        ];
        assert_eq!(line_path(&points), "M 0 20 L 50 15.5 L 100 10");
        assert_eq!(
            area_path(&points),
            "M 0 200 L 0 20 L 50 15.5 L 100 10 L 100 200 Z",
        );
        assert_eq!(area_path(&[]), "");
    }

    #[test]
    fn test_quarter_pie_segment_geometry() {
        // 0..90 degrees: starts at 12 o'clock (60,10), arc lands at
        // 3 o'clock (110,60), wedge cornered on the center.
        assert_eq!(
            pie_segment_path(0.0, 90.0),
            "M 60 60 L 110 60 A 50 50 0 0 0 60 10 Z",
        );
    }

    #[test]
    fn test_large_arc_flag_past_half_circle() {
        let path = pie_segment_path(0.0, 270.0);
        assert!(path.contains("A 50 50 0 1 0"));
    }

    #[test]
    fn test_pie_slices_clamped_and_colored() {
        let slices = pie_slices(PieKind::Traffic, &[0.0, 0.5, 0.99, 0.2]);
        assert_eq!(slices.len(), 4);
        assert_eq!(slices[0].label, "Organic Search");
        // jitter 0.0 pulls 10 points below the even split: 25 - 10 = 15.
        assert_eq!(slices[0].percentage, 15);
        assert_eq!(slices[1].percentage, 25);
        assert!(slices.iter().all(|s| s.percentage >= 5));
        assert_eq!(slices[2].color, PALETTE[2]);
    }

    #[test]
    fn test_svg_fragments_are_well_formed() {
        let points = trend_points(TrendKind::Users, &[0.1; 6]);
        let svg = trend_svg(&points);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<circle").count(), 6);

        let slices = pie_slices(PieKind::Revenue, &[0.5; 4]);
        let pie = pie_svg(&slices);
        assert_eq!(pie.matches("<path").count(), 4);
    }

    #[test]
    fn test_kind_parsing_roundtrip() {
        for kind in TrendKind::ALL {
            assert_eq!(TrendKind::parse(kind.as_str()), Some(kind));
        }
        for kind in PieKind::ALL {
            assert_eq!(PieKind::parse(kind.as_str()), Some(kind));
        }
        assert!(TrendKind::parse("bogus").is_none());
        assert!(PieKind::parse("").is_none());
    }

    #[test]
    fn test_category_palette_is_shared() {
        // The data-section tabs reuse the chart palette, one color per
        // category.
        assert_eq!(DataCategory::ALL.len(), PALETTE.len());
    }
}
