//! ASCII plotting for terminal output.
//!
//! Fixed-size grid, deterministic output (golden-tested).
//!
//! Plot elements:
//! - observed history: `o`
//! - forecast: `-` line
//! - interval bounds: `.` lines

use chrono::NaiveDateTime;

use crate::domain::ForecastPoint;

const HEADER_FMT: &str = "%Y-%m-%d %H:%M";

/// Render recent history followed by the forecast and its interval.
pub fn render_forecast_plot(
    history: &[(NaiveDateTime, f64)],
    forecast: &[ForecastPoint],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((t_min, t_max)) = time_range(history, forecast) else {
        return "Plot: nothing to draw\n".to_string();
    };
    let (y_min, y_max) = y_range(history, forecast).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let span_h = hours_between(t_min, t_max).max(1e-9);
    let to_xy = |ds: NaiveDateTime, y: f64| {
        (
            map_x(hours_between(t_min, ds), 0.0, span_h, width),
            map_y(y, y_min, y_max, height),
        )
    };

    let mut grid = vec![vec![' '; width]; height];

    // The forecast line goes first so the band never hides it.
    let line: Vec<(usize, usize)> = forecast.iter().map(|p| to_xy(p.ds, p.yhat)).collect();
    draw_polyline(&mut grid, &line, '-');
    let upper: Vec<(usize, usize)> = forecast.iter().map(|p| to_xy(p.ds, p.yhat_upper)).collect();
    draw_polyline(&mut grid, &upper, '.');
    let lower: Vec<(usize, usize)> = forecast.iter().map(|p| to_xy(p.ds, p.yhat_lower)).collect();
    draw_polyline(&mut grid, &lower, '.');

    for &(ds, y) in history {
        let (x, yy) = to_xy(ds, y);
        grid[yy][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: ds=[{}, {}] | y=[{y_min:.2}, {y_max:.2}]\n",
        t_min.format(HEADER_FMT),
        t_max.format(HEADER_FMT),
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn hours_between(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    (b - a).num_seconds() as f64 / 3600.0
}

fn time_range(history: &[(NaiveDateTime, f64)], forecast: &[ForecastPoint]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let times = history.iter().map(|(t, _)| *t).chain(forecast.iter().map(|p| p.ds));
    let (mut lo, mut hi): (Option<NaiveDateTime>, Option<NaiveDateTime>) = (None, None);
    for t in times {
        lo = Some(lo.map_or(t, |v| v.min(t)));
        hi = Some(hi.map_or(t, |v| v.max(t)));
    }
    lo.zip(hi)
}

fn y_range(history: &[(NaiveDateTime, f64)], forecast: &[ForecastPoint]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in history {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    for p in forecast {
        min_y = min_y.min(p.yhat_lower.min(p.yhat));
        max_y = max_y.max(p.yhat_upper.max(p.yhat));
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        None
    } else if max_y > min_y {
        Some((min_y, max_y))
    } else {
        Some((min_y - 1.0, max_y + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y max is row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(grid: &mut [Vec<char>], points: &[(usize, usize)], ch: char) {
    let Some(&(x, y)) = points.first() else { return };
    if grid[y][x] == ' ' {
        grid[y][x] = ch;
    }
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        draw_line(grid, x0, y0, x1, y1, ch);
    }
}

/// Integer line drawing (Bresenham-ish). Only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
