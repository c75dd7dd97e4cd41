use std::fs;
use std::path::PathBuf;

use anyhow::anyhow;
use astrochop::core::time;
use chrono::DateTime;
use clap::Parser;
use csv::ReaderBuilder;
use plotters::prelude::*;

/// Render a porkchop heatmap from a generated CSV.
#[derive(Parser, Debug)]
#[command(author, version, about = "Porkchop heatmap renderer (c3 or arrival v-inf)")]
struct Cli {
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value = "artifacts/porkchop.png")]
    output: PathBuf,
    /// Metric column to color by
    #[arg(long, default_value = "c3_km2_s2")]
    metric: String,
    #[arg(long, default_value_t = 1200)]
    width: u32,
    #[arg(long, default_value_t = 900)]
    height: u32,
    /// Clip the color scale at min * factor to keep the valley readable
    #[arg(long, default_value_t = 4.0)]
    high_clip_factor: f64,
}

#[derive(Debug, Clone)]
struct Cell {
    launch_jd: f64,
    arrival_jd: f64,
    metric_value: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cells = read_cells(&cli.input, &cli.metric)?;
    if cells.is_empty() {
        return Err(anyhow!("no converged cells in {}", cli.input.display()));
    }

    let mut launch_vals: Vec<f64> = cells.iter().map(|c| c.launch_jd).collect();
    let mut arrival_vals: Vec<f64> = cells.iter().map(|c| c.arrival_jd).collect();
    launch_vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    launch_vals.dedup();
    arrival_vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    arrival_vals.dedup();

    let grid = build_grid(&cells, &launch_vals, &arrival_vals);

    let mut min_value = f64::INFINITY;
    let mut max_value = f64::NEG_INFINITY;
    let mut min_pos = (0usize, 0usize);
    for (arr_idx, row) in grid.iter().enumerate() {
        for (dep_idx, &v) in row.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            if v < min_value {
                min_value = v;
                min_pos = (dep_idx, arr_idx);
            }
            if v > max_value {
                max_value = v;
            }
        }
    }
    let mut high_clip = (min_value * cli.high_clip_factor).min(max_value);
    if !high_clip.is_finite() || high_clip <= min_value {
        high_clip = min_value + 1.0;
    }

    if let Some(parent) = cli.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let output_str = cli
        .output
        .to_str()
        .ok_or_else(|| anyhow!("output path contains invalid UTF-8"))?;
    let root = BitMapBackend::new(output_str, (cli.width, cli.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let font_family = select_font_family();
    let caption_font = FontDesc::new(font_family, 24.0, FontStyle::Bold);
    let label_font = FontDesc::new(font_family, 16.0, FontStyle::Normal);

    let legend_width = 140i32;
    let (plot_area, legend_area) = root.split_horizontally((cli.width as i32 - legend_width).max(200));

    let launch_min = *launch_vals.first().unwrap();
    let launch_max = *launch_vals.last().unwrap();
    let arrival_min = *arrival_vals.first().unwrap();
    let arrival_max = *arrival_vals.last().unwrap();
    let launch_step = axis_step(&launch_vals);
    let arrival_step = axis_step(&arrival_vals);

    {
        let mut chart = ChartBuilder::on(&plot_area)
            .caption(format!("Porkchop ({})", cli.metric), caption_font.clone())
            .margin(10)
            .x_label_area_size(55)
            .y_label_area_size(95)
            .build_cartesian_2d(
                launch_min..launch_max + launch_step,
                arrival_min..arrival_max + arrival_step,
            )?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_desc("Launch date")
            .y_desc("Arrival date")
            .x_labels(6)
            .y_labels(8)
            .x_label_formatter(&|jd| date_label(*jd))
            .y_label_formatter(&|jd| date_label(*jd))
            .x_label_style(label_font.clone())
            .y_label_style(label_font.clone())
            .axis_desc_style(label_font.clone())
            .draw()?;

        for (arr_idx, row) in grid.iter().enumerate() {
            for (dep_idx, &value) in row.iter().enumerate() {
                let x0 = launch_vals[dep_idx];
                let y0 = arrival_vals[arr_idx];
                let color = if value.is_finite() {
                    let t = ((value - min_value) / (high_clip - min_value)).clamp(0.0, 1.0);
                    jet_color(t)
                } else {
                    RGBColor(235, 235, 235)
                };
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(x0, y0), (x0 + launch_step, y0 + arrival_step)],
                    color.filled(),
                )))?;
            }
        }

        let marker_color = RGBColor(210, 100, 20);
        let (min_dep_idx, min_arr_idx) = min_pos;
        chart.draw_series(std::iter::once(Circle::new(
            (
                launch_vals[min_dep_idx] + 0.5 * launch_step,
                arrival_vals[min_arr_idx] + 0.5 * arrival_step,
            ),
            7,
            marker_color.stroke_width(3),
        )))?;
    }

    {
        let mut chart = ChartBuilder::on(&legend_area)
            .margin(18)
            .y_label_area_size(70)
            .build_cartesian_2d(0.0..1.0, min_value..high_clip)?;

        let bands = 300;
        for i in 0..bands {
            let t0 = i as f64 / bands as f64;
            let t1 = (i + 1) as f64 / bands as f64;
            let v0 = min_value + (high_clip - min_value) * t0;
            let v1 = min_value + (high_clip - min_value) * t1;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(0.0, v0), (1.0, v1)],
                jet_color(t0).filled(),
            )))?;
        }

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_labels(0)
            .y_labels(6)
            .y_desc(cli.metric.as_str())
            .y_label_style(label_font.clone())
            .axis_desc_style(label_font)
            .y_label_formatter(&|v| format!("{v:.2}"))
            .draw()?;
    }

    root.present()?;
    eprintln!("wrote {}", cli.output.display());
    Ok(())
}

fn select_font_family() -> FontFamily<'static> {
    if cfg!(target_os = "macos") {
        FontFamily::Name("Helvetica")
    } else if cfg!(target_os = "windows") {
        FontFamily::Name("Arial")
    } else {
        FontFamily::Name("DejaVu Sans")
    }
}

fn date_label(jd: f64) -> String {
    let unix = time::unix_seconds_from_jd(jd);
    match DateTime::from_timestamp(unix.round() as i64, 0) {
        Some(stamp) => stamp.date_naive().format("%Y-%m-%d").to_string(),
        None => format!("{jd:.0}"),
    }
}

fn axis_step(vals: &[f64]) -> f64 {
    if vals.len() > 1 { vals[1] - vals[0] } else { 1.0 }
}

fn read_cells(path: &PathBuf, metric_name: &str) -> anyhow::Result<Vec<Cell>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("CSV missing '{name}' column"))
    };
    let launch_idx = position("launch_jd")?;
    let arrival_idx = position("arrival_jd")?;
    let converged_idx = position("converged")?;
    let metric_idx = position(metric_name)?;

    let mut cells = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let launch_jd: f64 = record.get(launch_idx).unwrap_or("").parse().unwrap_or(f64::NAN);
        let arrival_jd: f64 = record.get(arrival_idx).unwrap_or("").parse().unwrap_or(f64::NAN);
        let converged = record
            .get(converged_idx)
            .unwrap_or("false")
            .eq_ignore_ascii_case("true");
        let metric_value: f64 = record.get(metric_idx).unwrap_or("").parse().unwrap_or(f64::NAN);
        if launch_jd.is_finite() && arrival_jd.is_finite() && converged && metric_value.is_finite() {
            cells.push(Cell {
                launch_jd,
                arrival_jd,
                metric_value,
            });
        }
    }
    Ok(cells)
}

fn jet_color(t_in: f64) -> RGBColor {
    let t = t_in.clamp(0.0, 1.0);
    let r = (1.5 - (4.0 * t - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * t - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * t - 1.0).abs()).clamp(0.0, 1.0);
    RGBColor((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

fn build_grid(cells: &[Cell], launch_vals: &[f64], arrival_vals: &[f64]) -> Vec<Vec<f64>> {
    let mut grid = vec![vec![f64::NAN; launch_vals.len()]; arrival_vals.len()];
    for cell in cells {
        let dep_idx = launch_vals
            .binary_search_by(|v| v.partial_cmp(&cell.launch_jd).unwrap())
            .unwrap_or_else(|i| i.min(launch_vals.len() - 1));
        let arr_idx = arrival_vals
            .binary_search_by(|v| v.partial_cmp(&cell.arrival_jd).unwrap())
            .unwrap_or_else(|i| i.min(arrival_vals.len() - 1));
        grid[arr_idx][dep_idx] = cell.metric_value;
    }
    grid
}
