//! Text serialization of a plane store
//!
//! The format is a brace-delimited listing of planes, each with its action
//! and its `(dimension, coefficient)` entries. Every dimension a plane is
//! defined at is written, zeros included, so the reader can rebuild the
//! plane's support from the entries it sees.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use bvi_core::{BoundError, PlaneConfig, Result, SparseVector};

use crate::plane::LbPlane;
use crate::store::PlaneStore;

/// Value of the `policyType` field
pub const POLICY_TYPE: &str = "MaxPlanesLowerBound";

const HEADER: &str = "\
# Lower bound policy: a list of planes, each an alpha vector over states
# paired with an action.
#
# A plane lists coefficients only for the states it is defined at. It
# applies to a belief b when every state with non-zero probability in b
# has an entry in the plane.
#
# To evaluate a belief b, discard the planes that do not apply to b and
# take the inner product of each remaining alpha vector with b. The
# largest product is a lower bound on the expected discounted reward from
# b, and the action of that plane achieves it.
";

fn write_plane<W: Write>(out: &mut W, plane: &LbPlane) -> Result<()> {
    let dims = plane.defined_dims();
    writeln!(out, "    {{")?;
    writeln!(out, "      action => {},", plane.action)?;
    writeln!(out, "      numEntries => {},", dims.len())?;
    writeln!(out, "      entries => [")?;
    for (n, i) in dims.iter().enumerate() {
        let sep = if n + 1 < dims.len() { "," } else { "" };
        writeln!(out, "        {}, {}{sep}", i, plane.coefficients.get(*i))?;
    }
    writeln!(out, "      ]")?;
    write!(out, "    }}")?;
    Ok(())
}

/// Write every plane of `store` in scan order
///
/// # Errors
///
/// Returns [`BoundError::Io`] if the writer fails.
pub fn write_policy<W: Write>(store: &PlaneStore, out: &mut W) -> Result<()> {
    writeln!(out, "{HEADER}")?;
    writeln!(out, "{{")?;
    writeln!(out, "  policyType => \"{POLICY_TYPE}\",")?;
    writeln!(out, "  numPlanes => {},", store.len())?;
    writeln!(out, "  planes => [")?;
    for (n, (_, plane)) in store.iter().enumerate() {
        if n > 0 {
            writeln!(out, ",")?;
        }
        write_plane(out, plane)?;
    }
    writeln!(out)?;
    writeln!(out, "  ]")?;
    writeln!(out, "}}")?;
    Ok(())
}

/// Write `store` to a file, replacing any existing contents
///
/// # Errors
///
/// Returns [`BoundError::Io`] if the file cannot be created or written.
pub fn write_to_file(store: &PlaneStore, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    write_policy(store, &mut out)?;
    out.flush()?;
    info!(path = %path.display(), planes = store.len(), "wrote lower bound policy");
    Ok(())
}

/// Split `key => value` into its parts, dropping a trailing comma
fn key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once("=>")?;
    let value = value.trim();
    Some((key.trim(), value.strip_suffix(',').unwrap_or(value).trim()))
}

fn parse_count(value: &str, source_name: &str, line: usize, key: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| BoundError::parse(source_name, line, format!("expected '{key} => <int>'")))
}

/// A plane whose entries are still being read
struct PendingPlane {
    action: usize,
    declared_entries: Option<usize>,
    entries: Vec<(usize, f64)>,
    start_line: usize,
}

impl PendingPlane {
    fn finish(self, num_states: usize, source_name: &str) -> Result<LbPlane> {
        if let Some(declared) = self.declared_entries {
            if declared != self.entries.len() {
                return Err(BoundError::parse(
                    source_name,
                    self.start_line,
                    format!(
                        "plane declares {declared} entries but lists {}",
                        self.entries.len()
                    ),
                ));
            }
        }
        let support: Vec<usize> = self.entries.iter().map(|(i, _)| *i).collect();
        let coefficients = SparseVector::from_entries(num_states, self.entries)?;
        LbPlane::masked(coefficients, self.action, support)
    }
}

/// Parse a policy previously produced by [`write_policy`].
///
/// Blank lines, `#` comments and lone braces or brackets are ignored. The
/// first meaningful line must declare the policy type; after that each
/// `action` line starts a new plane and each `<int>, <double>` line adds an
/// entry to the current one. Declared plane and entry counts are checked.
///
/// # Errors
///
/// Returns [`BoundError::PolicyParse`] naming `source_name` and the
/// offending line for any malformed input, or [`BoundError::Io`] if
/// reading fails. No partial store is returned.
pub fn read_policy<R: BufRead>(
    reader: R,
    source_name: &str,
    num_states: usize,
    config: &PlaneConfig,
) -> Result<PlaneStore> {
    let mut store = PlaneStore::new(num_states, config)?;
    let mut seen_policy_type = false;
    let mut declared_planes: Option<usize> = None;
    let mut current: Option<PendingPlane> = None;

    for (n, raw) in reader.lines().enumerate() {
        let lnum = n + 1;
        let raw = raw?;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "{" | "}" | "}," | "[" | "]" | "],") {
            continue;
        }

        if !seen_policy_type {
            match key_value(line) {
                Some(("policyType", value)) if value.trim_matches('"') == POLICY_TYPE => {
                    seen_policy_type = true;
                    continue;
                }
                _ => {
                    return Err(BoundError::parse(
                        source_name,
                        lnum,
                        format!("expected 'policyType => \"{POLICY_TYPE}\"'"),
                    ))
                }
            }
        }

        match key_value(line) {
            Some(("numPlanes", value)) => {
                declared_planes = Some(parse_count(value, source_name, lnum, "numPlanes")?);
            }
            Some(("planes" | "entries", "[")) => {}
            Some(("action", value)) => {
                let action = parse_count(value, source_name, lnum, "action")?;
                if let Some(done) = current.take() {
                    store.add_plane(done.finish(num_states, source_name)?)?;
                }
                current = Some(PendingPlane {
                    action,
                    declared_entries: None,
                    entries: Vec::new(),
                    start_line: lnum,
                });
            }
            Some(("numEntries", value)) => {
                let count = parse_count(value, source_name, lnum, "numEntries")?;
                match current.as_mut() {
                    Some(plane) => plane.declared_entries = Some(count),
                    None => {
                        return Err(BoundError::parse(
                            source_name,
                            lnum,
                            "expected 'action => <int>'",
                        ))
                    }
                }
            }
            Some((key, _)) => {
                return Err(BoundError::parse(
                    source_name,
                    lnum,
                    format!("unexpected field '{key}'"),
                ));
            }
            None => {
                let Some(plane) = current.as_mut() else {
                    return Err(BoundError::parse(
                        source_name,
                        lnum,
                        "expected 'action => <int>'",
                    ));
                };
                let entry = parse_entry(line).ok_or_else(|| {
                    BoundError::parse(source_name, lnum, "expected entry '<int>, <double>'")
                })?;
                if entry.0 >= num_states {
                    return Err(BoundError::parse(
                        source_name,
                        lnum,
                        format!("entry index {} out of range for {num_states} states", entry.0),
                    ));
                }
                plane.entries.push(entry);
            }
        }
    }

    if !seen_policy_type {
        return Err(BoundError::parse(
            source_name,
            0,
            format!("missing 'policyType => \"{POLICY_TYPE}\"'"),
        ));
    }
    if let Some(done) = current.take() {
        store.add_plane(done.finish(num_states, source_name)?)?;
    }
    if let Some(declared) = declared_planes {
        if declared != store.len() {
            return Err(BoundError::parse(
                source_name,
                0,
                format!("policy declares {declared} planes but lists {}", store.len()),
            ));
        }
    }

    store.mark_loaded();
    Ok(store)
}

/// Parse `<int>, <double>` with an optional trailing comma
fn parse_entry(line: &str) -> Option<(usize, f64)> {
    let line = line.strip_suffix(',').unwrap_or(line);
    let (index, value) = line.split_once(',')?;
    Some((index.trim().parse().ok()?, value.trim().parse().ok()?))
}

/// Read a policy file
///
/// # Errors
///
/// As [`read_policy`], plus [`BoundError::Io`] if the file cannot be
/// opened.
pub fn read_from_file(
    path: impl AsRef<Path>,
    num_states: usize,
    config: &PlaneConfig,
) -> Result<PlaneStore> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let store = read_policy(reader, &path.display().to_string(), num_states, config)?;
    info!(path = %path.display(), planes = store.len(), "read lower bound policy");
    Ok(store)
}
