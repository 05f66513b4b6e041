//! Debug-only YAML dumps of layouts.
//!
//! Serializes a [`Layouts`] back into the configuration entry-list form it
//! can be parsed from, outermost level first. This is a sibling of the
//! engine, intended for inspecting candidates by eye; nothing in the core
//! depends on it.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::components::{LayoutNest, Layouts};

#[derive(Serialize)]
struct Entry<'a> {
    target: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    factors: String,
    permutation: String,
}

#[derive(Serialize)]
struct Document<'a> {
    layout: Vec<Entry<'a>>,
}

/// Merge the per-dataspace nests of one side into a single factor line.
///
/// Ranks keep their first-seen order across dataspaces; a rank appearing in
/// several dataspaces takes its largest factor.
fn combine(nests: &[LayoutNest]) -> (String, String) {
    let mut ranks: Vec<&str> = Vec::new();
    for nest in nests {
        for rank in &nest.ranks {
            if !ranks.contains(&rank.as_str()) {
                ranks.push(rank);
            }
        }
    }

    let mut factors = String::new();
    let mut permutation = String::new();
    for rank in &ranks {
        let factor = nests
            .iter()
            .map(|nest| nest.factor(rank))
            .max()
            .unwrap_or(1);
        if !factors.is_empty() {
            factors.push(' ');
        }
        factors.push_str(&format!("{rank}={factor}"));
        permutation.push_str(rank);
    }
    (factors, permutation)
}

/// Render `layouts` as a YAML document.
pub fn to_yaml_string(layouts: &Layouts) -> Result<String, serde_yaml_ng::Error> {
    let mut entries = Vec::new();
    for level in layouts.levels.iter().rev() {
        for (kind, nests) in [("interline", &level.interline), ("intraline", &level.intraline)] {
            if nests.is_empty() {
                continue;
            }
            let (factors, permutation) = combine(nests);
            entries.push(Entry {
                target: &level.target,
                kind,
                factors,
                permutation,
            });
        }
    }
    serde_yaml_ng::to_string(&Document { layout: entries })
}

/// Write the YAML rendering of `layouts` to `path`.
pub fn dump_to_file(layouts: &Layouts, path: impl AsRef<Path>) -> std::io::Result<()> {
    let rendered = to_yaml_string(layouts).map_err(std::io::Error::other)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(rendered.as_bytes())
}
