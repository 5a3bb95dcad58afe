// src/renderer.rs

use crate::aggregator::Artifacts;
use crate::error::{Error, Result};
use crate::model::ID_LEN;
use image::{Rgb, RgbImage};
use palette::{FromColor, Lch, Srgb};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

const MARGIN: u32 = 24;

/// Vertical advance of one glyph in a stacked label
const GLYPH_PITCH: u32 = 6;
/// Room under the axis for the changeset labels
const LABEL_BAND: u32 = ID_LEN as u32 * GLYPH_PITCH;

/// 3x5 bitmaps for the hex digits, one byte per row, 0b100 is the left column.
static HEX_GLYPHS: [[u8; 5]; 16] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b001, 0b001, 0b001], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
    [0b010, 0b101, 0b111, 0b101, 0b101], // a
    [0b110, 0b101, 0b110, 0b101, 0b110], // b
    [0b011, 0b100, 0b100, 0b100, 0b011], // c
    [0b110, 0b101, 0b101, 0b101, 0b110], // d
    [0b111, 0b100, 0b110, 0b100, 0b111], // e
    [0b111, 0b100, 0b110, 0b100, 0b100], // f
];
static DOT_GLYPH: [u8; 5] = [0, 0, 0, 0, 0b010];

/// One series of bars drawn into a chart
struct Layer {
    values: Vec<f64>,
    color: Rgb<u8>,
    /// Width of each bar as a fraction of its slot
    fill: f32,
}

struct Chart {
    file_name: String,
    layers: Vec<Layer>,
    /// Changeset id under each slot
    labels: Vec<String>,
}

fn lch_to_rgb(color: Lch) -> Rgb<u8> {
    let srgb: Srgb<f32> = Srgb::from_color(color);
    let (r, g, b) = srgb.into_components();
    Rgb([
        (r.clamp(0.0, 1.0) * 255.0) as u8,
        (g.clamp(0.0, 1.0) * 255.0) as u8,
        (b.clamp(0.0, 1.0) * 255.0) as u8,
    ])
}

fn tests_color() -> Rgb<u8> {
    lch_to_rgb(Lch::new(55.0f32, 60.0f32, 260.0f32)) // Blue
}

fn ratio_color() -> Rgb<u8> {
    lch_to_rgb(Lch::new(75.0f32, 80.0f32, 50.0f32)) // Orange
}

/// Renders the test-count histogram (with the tests-per-file ratio drawn on
/// top of it) and a ratio-only histogram as PNGs in `dir`.
pub fn render_histograms(
    artifacts: &Artifacts,
    dir: &Path,
    timestamp: i64,
    width: u32,
    height: u32,
) -> Result<Vec<PathBuf>> {
    let counts: Vec<f64> = artifacts.test_counts.iter().map(|&(n, _)| n as f64).collect();
    let ratios = artifacts.tests_per_file_ratios();
    let labels: Vec<String> = artifacts.test_counts.iter().map(|(_, id)| id.to_string()).collect();

    let charts = vec![
        Chart {
            file_name: format!("{timestamp}_tests_scheduled.png"),
            layers: vec![
                Layer {
                    values: counts,
                    color: tests_color(),
                    fill: 0.8,
                },
                Layer {
                    values: ratios.clone(),
                    color: ratio_color(),
                    fill: 0.5,
                },
            ],
            labels: labels.clone(),
        },
        Chart {
            file_name: format!("{timestamp}_tests_per_file.png"),
            layers: vec![Layer {
                values: ratios,
                color: ratio_color(),
                fill: 0.8,
            }],
            labels,
        },
    ];

    charts
        .into_par_iter()
        .map(|chart| {
            let path = dir.join(&chart.file_name);
            let image = draw(&chart, width, height);
            image.save(&path).map_err(|source| Error::Render {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %path.display(), "rendered");
            Ok(path)
        })
        .collect()
}

fn put(image: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    if x < image.width() && y < image.height() {
        image.put_pixel(x, y, color);
    }
}

fn glyph(c: char) -> Option<&'static [u8; 5]> {
    match c {
        '.' => Some(&DOT_GLYPH),
        _ => c.to_digit(16).map(|d| &HEX_GLYPHS[d as usize]),
    }
}

fn draw_glyph(image: &mut RgbImage, rows: &[u8; 5], x: u32, y: u32, color: Rgb<u8>) {
    for (dy, row) in rows.iter().enumerate() {
        for dx in 0..3 {
            if row & (0b100 >> dx) != 0 {
                put(image, x + dx, y + dy as u32, color);
            }
        }
    }
}

/// Left to right, 4px per character.
fn draw_text(image: &mut RgbImage, text: &str, x: u32, y: u32, color: Rgb<u8>) {
    for (i, rows) in text.chars().filter_map(glyph).enumerate() {
        draw_glyph(image, rows, x + 4 * i as u32, y, color);
    }
}

/// Top to bottom, one character per `GLYPH_PITCH` rows, so long ids fit
/// under narrow slots.
fn draw_stacked(image: &mut RgbImage, text: &str, x: u32, y: u32, color: Rgb<u8>) {
    for (i, rows) in text.chars().filter_map(glyph).enumerate() {
        draw_glyph(image, rows, x, y + GLYPH_PITCH * i as u32, color);
    }
}

fn scale_label(max_value: f64) -> String {
    if max_value.fract() == 0.0 {
        format!("{max_value:.0}")
    } else {
        format!("{max_value:.2}")
    }
}

/// Bars share the y scale of the tallest value across all layers, so an
/// overlaid layer stays comparable to the one beneath it. The scale's top
/// value is printed left of the plot; each slot gets a tick and, when there
/// is room, its changeset id stacked vertically below the axis.
fn draw(chart: &Chart, width: u32, height: u32) -> RgbImage {
    let bg_color = Rgb([8, 8, 12]);
    let axis_color = Rgb([90, 90, 100]);
    let label_color = Rgb([170, 170, 180]);
    let mut image = RgbImage::from_pixel(width, height, bg_color);

    let slots = chart.layers.iter().map(|l| l.values.len()).max().unwrap_or(0);
    let max_value = chart
        .layers
        .iter()
        .flat_map(|l| l.values.iter().copied())
        .fold(0.0f64, f64::max);
    if width <= 2 * MARGIN || height <= 2 * MARGIN {
        return image;
    }
    let band = if !chart.labels.is_empty() && height > 2 * MARGIN + LABEL_BAND + 16 {
        LABEL_BAND
    } else {
        0
    };
    let plot_width = (width - 2 * MARGIN) as f32;
    let plot_height = (height - 2 * MARGIN - band) as f32;
    let baseline = height - MARGIN - band;

    for x in MARGIN..width - MARGIN {
        image.put_pixel(x, baseline, axis_color);
    }
    if slots == 0 {
        return image;
    }

    let slot_width = plot_width / slots as f32;
    let center = |i: usize| MARGIN as f32 + slot_width * (i as f32 + 0.5);
    for i in 0..slots {
        let x = center(i).round() as u32;
        for y in baseline + 1..baseline + 4 {
            put(&mut image, x, y, axis_color);
        }
    }
    if band > 0 && slot_width >= 4.0 {
        for (i, label) in chart.labels.iter().enumerate().take(slots) {
            let x = center(i).round() as u32 - 1;
            draw_stacked(&mut image, label, x, baseline + GLYPH_PITCH, label_color);
        }
    }
    if max_value <= 0.0 {
        return image;
    }

    let scale = scale_label(max_value);
    let text_width = 4 * scale.chars().count() as u32;
    draw_text(&mut image, &scale, (MARGIN - 2).saturating_sub(text_width), MARGIN - 2, label_color);

    for layer in &chart.layers {
        let bar_width = (slot_width * layer.fill).max(1.0);
        for (i, &value) in layer.values.iter().enumerate() {
            let bar_height = ((value / max_value) as f32 * plot_height).round() as u32;
            if bar_height == 0 {
                continue;
            }
            let x0 = (center(i) - bar_width / 2.0).floor().max(MARGIN as f32) as u32;
            let x1 = ((center(i) + bar_width / 2.0).ceil() as u32).min(width - MARGIN);
            for x in x0..x1 {
                for y in (baseline - bar_height)..baseline {
                    image.put_pixel(x, y, layer.color);
                }
            }
        }
    }
    image
}
