//! Path Sampling
//!
//! Turns letter stroke descriptions into dense point sequences.
//!
//! Stroke data uses SVG path syntax restricted to absolute commands:
//! - `M x,y [x,y ...]` move, extra pairs continue as line-tos
//! - `L x,y ...` line
//! - `C x1,y1 x2,y2 x,y ...` cubic Bézier
//! - `A rx,ry rot large,sweep x,y ...` elliptical arc
//! - `Z` close the current subpath
//!
//! Lower-case letters are read as their upper-case form. Anything else is
//! malformed, and a malformed stroke samples to an empty point list.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::config::{ArcSampling, TraceConfig};
use crate::error::{EngineError, EngineResult};
use crate::types::Point;

// ==================== Commands ====================

/// One absolute drawing command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    CubicTo {
        ctrl1: Point,
        ctrl2: Point,
        end: Point,
    },
    ArcTo {
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep: bool,
        end: Point,
    },
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Command(char),
    Number(f64),
}

fn tokenize(d: &str) -> EngineResult<Vec<Token>> {
    let chars: Vec<char> = d.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == ',' {
            i += 1;
            continue;
        }
        if c.is_ascii_alphabetic() && c != 'e' && c != 'E' {
            tokens.push(Token::Command(c.to_ascii_uppercase()));
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' {
            let start = i;
            i += 1;
            while i < chars.len() {
                let n = chars[i];
                let after_exponent = matches!(chars[i - 1], 'e' | 'E');
                if n.is_ascii_digit() || n == '.' || n == 'e' || n == 'E' {
                    i += 1;
                } else if (n == '-' || n == '+') && after_exponent {
                    i += 1;
                } else {
                    break;
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| EngineError::MalformedPath(format!("invalid number '{literal}'")))?;
            if !value.is_finite() {
                return Err(EngineError::MalformedPath(format!(
                    "non-finite number '{literal}'"
                )));
            }
            tokens.push(Token::Number(value));
            continue;
        }
        return Err(EngineError::MalformedPath(format!(
            "unexpected character '{c}' at offset {i}"
        )));
    }

    Ok(tokens)
}

fn pair(args: &[f64]) -> Point {
    Point::new(args[0], args[1])
}

fn check_arity(command: char, args: &[f64], arity: usize) -> EngineResult<()> {
    if args.is_empty() || args.len() % arity != 0 {
        return Err(EngineError::MalformedPath(format!(
            "command {command} takes groups of {arity} numbers, got {}",
            args.len()
        )));
    }
    Ok(())
}

/// Parses path data into absolute commands, validating each command's arity
pub fn parse_path(d: &str) -> EngineResult<Vec<PathCommand>> {
    let tokens = tokenize(d)?;
    let mut commands = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let letter = match tokens[i] {
            Token::Command(c) => c,
            Token::Number(n) => {
                return Err(EngineError::MalformedPath(format!(
                    "number {n} appears before any command"
                )))
            }
        };
        i += 1;

        let mut args = Vec::new();
        while let Some(Token::Number(n)) = tokens.get(i) {
            args.push(*n);
            i += 1;
        }

        match letter {
            'M' => {
                check_arity(letter, &args, 2)?;
                commands.push(PathCommand::MoveTo(pair(&args[0..2])));
                for chunk in args[2..].chunks_exact(2) {
                    commands.push(PathCommand::LineTo(pair(chunk)));
                }
            }
            'L' => {
                check_arity(letter, &args, 2)?;
                for chunk in args.chunks_exact(2) {
                    commands.push(PathCommand::LineTo(pair(chunk)));
                }
            }
            'C' => {
                check_arity(letter, &args, 6)?;
                for chunk in args.chunks_exact(6) {
                    commands.push(PathCommand::CubicTo {
                        ctrl1: pair(&chunk[0..2]),
                        ctrl2: pair(&chunk[2..4]),
                        end: pair(&chunk[4..6]),
                    });
                }
            }
            'A' => {
                check_arity(letter, &args, 7)?;
                for chunk in args.chunks_exact(7) {
                    commands.push(PathCommand::ArcTo {
                        rx: chunk[0],
                        ry: chunk[1],
                        x_axis_rotation: chunk[2],
                        large_arc: chunk[3] != 0.0,
                        sweep: chunk[4] != 0.0,
                        end: pair(&chunk[5..7]),
                    });
                }
            }
            'Z' => {
                if !args.is_empty() {
                    return Err(EngineError::MalformedPath(
                        "command Z takes no arguments".to_string(),
                    ));
                }
                commands.push(PathCommand::Close);
            }
            other => {
                return Err(EngineError::MalformedPath(format!(
                    "unsupported command '{other}'"
                )))
            }
        }
    }

    Ok(commands)
}

// ==================== Curves ====================

/// Cubic Bézier point at parameter `t`
pub fn cubic_bezier(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    Point {
        x: a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        y: a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    }
}

/// Center parameterization of an SVG arc
#[derive(Debug, Clone, Copy)]
struct ArcCenter {
    center: Point,
    rx: f64,
    ry: f64,
    cos_phi: f64,
    sin_phi: f64,
    start_angle: f64,
    sweep_angle: f64,
}

impl ArcCenter {
    fn point_at(&self, angle: f64) -> Point {
        let (sin_a, cos_a) = angle.sin_cos();
        Point {
            x: self.center.x + self.rx * self.cos_phi * cos_a - self.ry * self.sin_phi * sin_a,
            y: self.center.y + self.rx * self.sin_phi * cos_a + self.ry * self.cos_phi * sin_a,
        }
    }
}

fn vector_angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    (ux * vy - uy * vx).atan2(ux * vx + uy * vy)
}

/// Endpoint-to-center conversion. `None` when the arc degenerates to a line or a point.
fn arc_center(
    from: Point,
    to: Point,
    rx: f64,
    ry: f64,
    rotation_deg: f64,
    large_arc: bool,
    sweep: bool,
) -> Option<ArcCenter> {
    if from == to {
        return None;
    }
    let mut rx = rx.abs();
    let mut ry = ry.abs();
    if rx == 0.0 || ry == 0.0 {
        return None;
    }

    let phi = rotation_deg.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let dx = (from.x - to.x) / 2.0;
    let dy = (from.y - to.y) / 2.0;
    let x1p = cos_phi * dx + sin_phi * dy;
    let y1p = -sin_phi * dx + cos_phi * dy;

    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let num = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
    let den = rx2 * y1p * y1p + ry2 * x1p * x1p;
    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let coef = sign * (num / den).max(0.0).sqrt();
    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * -(ry * x1p / rx);

    let center = Point {
        x: cos_phi * cxp - sin_phi * cyp + (from.x + to.x) / 2.0,
        y: sin_phi * cxp + cos_phi * cyp + (from.y + to.y) / 2.0,
    };

    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;
    let start_angle = vector_angle(1.0, 0.0, ux, uy);
    let mut sweep_angle = vector_angle(ux, uy, vx, vy);
    if !sweep && sweep_angle > 0.0 {
        sweep_angle -= 2.0 * PI;
    } else if sweep && sweep_angle < 0.0 {
        sweep_angle += 2.0 * PI;
    }

    Some(ArcCenter {
        center,
        rx,
        ry,
        cos_phi,
        sin_phi,
        start_angle,
        sweep_angle,
    })
}

// ==================== Sampler ====================

/// Uniform per-segment path sampler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSampler {
    samples_per_segment: usize,
    arc_sampling: ArcSampling,
}

impl Default for PathSampler {
    fn default() -> Self {
        Self::from_config(&TraceConfig::default())
    }
}

impl PathSampler {
    pub fn new(samples_per_segment: usize, arc_sampling: ArcSampling) -> Self {
        Self {
            samples_per_segment: samples_per_segment.max(1),
            arc_sampling,
        }
    }

    pub fn from_config(config: &TraceConfig) -> Self {
        Self::new(config.samples_per_segment, config.arc_sampling)
    }

    pub fn samples_per_segment(&self) -> usize {
        self.samples_per_segment
    }

    /// Samples one stroke; malformed data yields an empty list
    pub fn sample(&self, d: &str) -> Vec<Point> {
        match self.try_sample(d) {
            Ok(points) => points,
            Err(err) => {
                tracing::warn!(error = %err, path = d, "stroke path could not be sampled");
                Vec::new()
            }
        }
    }

    pub fn try_sample(&self, d: &str) -> EngineResult<Vec<Point>> {
        let commands = parse_path(d)?;
        Ok(self.sample_commands(&commands))
    }

    /// Samples all strokes of a letter in order.
    ///
    /// One malformed stroke makes the whole shape unavailable, so the result is empty.
    pub fn sample_strokes<'a, I>(&self, strokes: I) -> Vec<Point>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut points = Vec::new();
        for d in strokes {
            match self.try_sample(d) {
                Ok(sampled) => points.extend(sampled),
                Err(err) => {
                    tracing::warn!(error = %err, path = d, "letter shape unavailable");
                    return Vec::new();
                }
            }
        }
        points
    }

    pub fn sample_commands(&self, commands: &[PathCommand]) -> Vec<Point> {
        let n = self.samples_per_segment;
        let mut points = Vec::with_capacity(commands.len() * n + 1);
        let mut current = Point::default();
        let mut subpath_start = current;

        for command in commands {
            match *command {
                PathCommand::MoveTo(p) => {
                    points.push(p);
                    current = p;
                    subpath_start = p;
                }
                PathCommand::LineTo(p) => {
                    self.push_line(&mut points, current, p);
                    current = p;
                }
                PathCommand::CubicTo { ctrl1, ctrl2, end } => {
                    for step in 1..=n {
                        let t = step as f64 / n as f64;
                        points.push(cubic_bezier(current, ctrl1, ctrl2, end, t));
                    }
                    current = end;
                }
                PathCommand::ArcTo {
                    rx,
                    ry,
                    x_axis_rotation,
                    large_arc,
                    sweep,
                    end,
                } => {
                    match self.arc_sampling {
                        ArcSampling::Endpoint => points.push(end),
                        ArcSampling::Full => {
                            match arc_center(current, end, rx, ry, x_axis_rotation, large_arc, sweep)
                            {
                                Some(arc) => {
                                    for step in 1..n {
                                        let t = step as f64 / n as f64;
                                        points.push(arc.point_at(arc.start_angle + arc.sweep_angle * t));
                                    }
                                    points.push(end);
                                }
                                None => self.push_line(&mut points, current, end),
                            }
                        }
                    }
                    current = end;
                }
                PathCommand::Close => {
                    if current != subpath_start {
                        self.push_line(&mut points, current, subpath_start);
                    }
                    current = subpath_start;
                }
            }
        }

        points
    }

    fn push_line(&self, points: &mut Vec<Point>, from: Point, to: Point) {
        let n = self.samples_per_segment;
        for step in 1..=n {
            points.push(from.lerp(&to, step as f64 / n as f64));
        }
    }
}

/// Picks `count` evenly spaced points; shorter inputs are returned as-is
pub fn downsample(points: &[Point], count: usize) -> Vec<Point> {
    if points.len() <= count {
        return points.to_vec();
    }
    if count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![points[0]];
    }

    let last = points.len() - 1;
    let step = last as f64 / (count - 1) as f64;
    (0..count)
        .map(|i| {
            let index = ((i as f64 * step).round() as usize).min(last);
            points[index]
        })
        .collect()
}
