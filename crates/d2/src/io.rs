//! Problem-file reading and result writing.
//!
//! Input format: line 1 is `width height`, line 2 the piece count, then
//! one piece per line as whitespace-separated `x,y` pairs in
//! counter-clockwise order. A line starting with `@` punches a hole into
//! the piece on the previous line. Output: one text file per bin with the
//! piece count followed by `id rotation x,y` records.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::warn;
use polybin_core::{Aabb, Error, Result};

use crate::bin::Bin;
use crate::piece::Piece;
use crate::EPS;

/// Reads a problem file: bin rectangle plus the piece list.
pub fn load_problem(path: impl AsRef<Path>) -> Result<(Aabb, Vec<Piece>)> {
    let text = fs::read_to_string(path)?;
    parse_problem(&text)
}

/// Parses problem text. See the module docs for the format.
pub fn parse_problem(text: &str) -> Result<(Aabb, Vec<Piece>)> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| Error::InvalidInput("empty problem file".into()))?;
    let mut dims = header.split_whitespace();
    let width = parse_number(dims.next(), "bin width")?;
    let height = parse_number(dims.next(), "bin height")?;
    if width <= 0.0 || height <= 0.0 {
        return Err(Error::InvalidBin(format!(
            "bin must have positive dimensions, got {width} x {height}"
        )));
    }

    let count_line = lines
        .next()
        .ok_or_else(|| Error::InvalidInput("missing piece count".into()))?;
    let expected: usize = count_line
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("bad piece count '{}'", count_line.trim())))?;

    let mut pieces: Vec<Piece> = Vec::with_capacity(expected);

    for line in lines {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix('@') {
            let Some(previous) = pieces.last_mut() else {
                return Err(Error::InvalidInput(
                    "hole line '@' before any piece".into(),
                ));
            };
            let hole_points = parse_points(rest)?;
            let hole = Piece::from_points(&hole_points, previous.id());
            let mut pierced = previous.difference(&hole);
            pierced.place_at(0.0, 0.0);
            *previous = pierced;
            continue;
        }

        if pieces.len() >= expected {
            warn!("ignoring extra piece line beyond the declared count of {expected}");
            continue;
        }

        let points = dedup_points(parse_points(trimmed)?);
        if points.len() < 3 {
            return Err(Error::InvalidInput(format!(
                "piece {} has fewer than 3 distinct vertices",
                pieces.len() + 1
            )));
        }
        let id = pieces.len() as u32 + 1;
        let piece = Piece::from_points(&points, id);
        if piece.area() <= EPS {
            return Err(Error::InvalidInput(format!("piece {id} has zero area")));
        }
        pieces.push(piece);
    }

    if pieces.len() != expected {
        warn!(
            "expected {expected} piece(s) but found {}",
            pieces.len()
        );
    }

    Ok((Aabb::with_size(width, height), pieces))
}

/// Writes one `bin-<n>.txt` per bin into `dir`.
pub fn write_bins(dir: impl AsRef<Path>, bins: &[Bin]) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    for (index, bin) in bins.iter().enumerate() {
        let mut out = format!("{}\n", bin.n_placed());
        for piece in bin.placed() {
            let bb = piece.bbox();
            out.push_str(&format!(
                "{} {} {},{}\n",
                piece.id(),
                piece.rotation(),
                bb.min_x,
                bb.min_y
            ));
        }
        fs::write(dir.join(format!("bin-{}.txt", index + 1)), out)?;
    }
    Ok(())
}

fn parse_number(token: Option<&str>, what: &str) -> Result<f64> {
    let token = token.ok_or_else(|| Error::InvalidInput(format!("missing {what}")))?;
    token
        .parse()
        .map_err(|_| Error::InvalidInput(format!("bad {what} '{token}'")))
}

fn parse_points(text: &str) -> Result<Vec<(f64, f64)>> {
    text.split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| Error::InvalidInput(format!("malformed point '{pair}'")))?;
            let x: f64 = x
                .parse()
                .map_err(|_| Error::InvalidInput(format!("bad coordinate '{x}'")))?;
            let y: f64 = y
                .parse()
                .map_err(|_| Error::InvalidInput(format!("bad coordinate '{y}'")))?;
            Ok((x, y))
        })
        .collect()
}

/// Drops repeated vertices, keeping first occurrences in order.
fn dedup_points(points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    let mut seen: HashSet<(u64, u64)> = HashSet::with_capacity(points.len());
    points
        .into_iter()
        .filter(|&(x, y)| seen.insert((x.to_bits(), y.to_bits())))
        .collect()
}
