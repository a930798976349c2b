#![cfg(feature = "web")]

//! PNG trend report for the customer portal's "generate report" action.
//!
//! Renders the same series the dashboard's SVG trend chart shows, but as
//! a downloadable bitmap: plotters draws into an RGB buffer and `image`
//! encodes it to PNG, all in memory.

use plotters::prelude::*;

use crate::charts::{TrendKind, TrendPoint};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 500;

/// Draws a line-with-markers chart of the trend series and returns the
/// encoded PNG bytes. Series values are reconstructed from the normalized
/// points so the report axis shows real magnitudes again.
pub fn trend_report_png(
    kind: TrendKind,
    points: &[TrendPoint],
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let base = kind.base_value();
    let series: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64 + 1.0, (100.0 - p.y) / 80.0 * base))
        .collect();

    let max_y = series
        .iter()
        .map(|(_, y)| *y)
        .fold(base, f64::max);

    let mut rgb = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(kind.title(), ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(0.5..series.len() as f64 + 0.5, 0.0..max_y * 1.1)?;

        chart
            .configure_mesh()
            .x_desc("Period")
            .y_desc(kind.title())
            .draw()?;

        chart.draw_series(LineSeries::new(series.iter().copied(), &BLUE))?;
        chart.draw_series(
            series
                .iter()
                .map(|(x, y)| Circle::new((*x, *y), 4, BLUE.filled())),
        )?;

        root.present()?;
    }

    let img = image::RgbImage::from_raw(WIDTH, HEIGHT, rgb)
        .ok_or("report buffer has unexpected dimensions")?;
    let mut png = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut png),
        image::ImageOutputFormat::Png,
    )?;
    Ok(png)
}
