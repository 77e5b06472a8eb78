//! Mesh file parsing and solution output.
//!
//! Two mesh formats are accepted and detected by sniffing: the plain
//! `nv nbt nbe` header format, and the sectioned `$Nodes`/`$Elements`
//! exchange format. Both produce the same `RawMesh2d` for the topology
//! builder. Output is one text file per time step (15 local dof values per
//! triangle line) plus a JSON metadata summary.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::assembly::global_index;
use crate::domain::geometry::Point;
use crate::domain::mesh2d::{Mesh2d, RawMesh2d};
use crate::error::MeshLoadError;

/// Loads a mesh file in either supported format.
pub fn load_mesh(path: &Path) -> Result<RawMesh2d, MeshLoadError> {
    let text = fs::read_to_string(path)?;
    let sectioned = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .is_some_and(|l| l.starts_with('$'));
    let raw = if sectioned {
        parse_sectioned(&text)?
    } else {
        parse_plain(&text)?
    };
    info!(
        path = %path.display(),
        nv = raw.vertices.len(),
        nbt = raw.triangles.len(),
        nbe = raw.edges.len(),
        "mesh file read"
    );
    Ok(raw)
}

/// Whitespace token stream that remembers the source line of each token.
struct Cursor<'a> {
    tokens: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        let tokens = text
            .lines()
            .enumerate()
            .flat_map(|(ln, line)| line.split_whitespace().map(move |t| (ln + 1, t)))
            .collect();
        Self { tokens, pos: 0 }
    }

    fn next(&mut self, what: &str) -> Result<(usize, &'a str), MeshLoadError> {
        match self.tokens.get(self.pos) {
            Some(&tok) => {
                self.pos += 1;
                Ok(tok)
            }
            None => Err(MeshLoadError::Truncated(format!("expected {}", what))),
        }
    }

    fn next_f64(&mut self, what: &str) -> Result<f64, MeshLoadError> {
        let (line, tok) = self.next(what)?;
        tok.parse().map_err(|_| MeshLoadError::Parse {
            line,
            reason: format!("expected {} but found '{}'", what, tok),
        })
    }

    fn next_usize(&mut self, what: &str) -> Result<usize, MeshLoadError> {
        let (line, tok) = self.next(what)?;
        tok.parse().map_err(|_| MeshLoadError::Parse {
            line,
            reason: format!("expected {} but found '{}'", what, tok),
        })
    }

    fn next_i32(&mut self, what: &str) -> Result<i32, MeshLoadError> {
        let (line, tok) = self.next(what)?;
        tok.parse().map_err(|_| MeshLoadError::Parse {
            line,
            reason: format!("expected {} but found '{}'", what, tok),
        })
    }

    /// Reads a 1-based file index and shifts it to the 0-based numbering.
    fn next_index(&mut self, what: &str) -> Result<usize, MeshLoadError> {
        let (line, tok) = self.next(what)?;
        let index: usize = tok.parse().map_err(|_| MeshLoadError::Parse {
            line,
            reason: format!("expected {} but found '{}'", what, tok),
        })?;
        index.checked_sub(1).ok_or(MeshLoadError::Parse {
            line,
            reason: format!("{} is 1-based in this format", what),
        })
    }
}

/// Plain format: `nv nbt nbe`, then nv `x y original_index` lines, nbt
/// `c1 c2 c3 unused` lines and nbe `e1 e2 label` lines, all indices
/// 1-based.
fn parse_plain(text: &str) -> Result<RawMesh2d, MeshLoadError> {
    let mut c = Cursor::new(text);
    let nv = c.next_usize("vertex count")?;
    let nbt = c.next_usize("triangle count")?;
    let nbe = c.next_usize("boundary edge count")?;

    let mut vertices = Vec::with_capacity(nv);
    for _ in 0..nv {
        let x = c.next_f64("vertex x")?;
        let y = c.next_f64("vertex y")?;
        c.next("vertex index")?; // original numbering, unused
        vertices.push(Point::new(x, y));
    }

    let mut triangles = Vec::with_capacity(nbt);
    for _ in 0..nbt {
        let mut corners = [0usize; 3];
        for corner in &mut corners {
            *corner = c.next_index("triangle corner")?;
        }
        c.next("triangle tag")?; // unused trailing field
        triangles.push(corners);
    }

    let mut edges = Vec::with_capacity(nbe);
    for _ in 0..nbe {
        let s1 = c.next_index("edge endpoint")?;
        let s2 = c.next_index("edge endpoint")?;
        let label = c.next_i32("edge label")?;
        edges.push((s1, s2, label));
    }

    Ok(RawMesh2d {
        vertices,
        triangles,
        edges,
    })
}

/// Sectioned format: a `$Nodes` block of `index x y z` lines followed by an
/// `$Elements` block of `id type ntags tags... nodes...` lines; element
/// type 2 is a triangle, anything else a boundary edge labelled with the
/// first tag. Node ids are 1-based.
fn parse_sectioned(text: &str) -> Result<RawMesh2d, MeshLoadError> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    lines
        .find(|&(_, l)| l == "$Nodes")
        .ok_or_else(|| MeshLoadError::Truncated("missing $Nodes section".to_string()))?;

    let (count_line, count_text) = lines
        .next()
        .ok_or_else(|| MeshLoadError::Truncated("missing node count".to_string()))?;
    let nv: usize = count_text.parse().map_err(|_| MeshLoadError::Parse {
        line: count_line,
        reason: format!("expected node count but found '{}'", count_text),
    })?;

    let mut vertices = Vec::with_capacity(nv);
    for i in 0..nv {
        let (line, l) = lines
            .next()
            .ok_or_else(|| MeshLoadError::Truncated("node list cut short".to_string()))?;
        let mut c = Cursor::new(l);
        let index = c.next_usize("node index")?;
        if index != i + 1 {
            return Err(MeshLoadError::Parse {
                line,
                reason: format!("non-sequential node index {}", index),
            });
        }
        let x = c.next_f64("node x")?;
        let y = c.next_f64("node y")?;
        c.next_f64("node z")?;
        vertices.push(Point::new(x, y));
    }

    lines
        .find(|&(_, l)| l == "$Elements")
        .ok_or_else(|| MeshLoadError::Truncated("missing $Elements section".to_string()))?;
    let (count_line, count_text) = lines
        .next()
        .ok_or_else(|| MeshLoadError::Truncated("missing element count".to_string()))?;
    let nel: usize = count_text.parse().map_err(|_| MeshLoadError::Parse {
        line: count_line,
        reason: format!("expected element count but found '{}'", count_text),
    })?;

    let mut triangles = Vec::new();
    let mut edges = Vec::new();
    for _ in 0..nel {
        let (_, l) = lines
            .next()
            .ok_or_else(|| MeshLoadError::Truncated("element list cut short".to_string()))?;
        let mut c = Cursor::new(l);
        c.next_usize("element id")?;
        let etype = c.next_usize("element type")?;
        let ntags = c.next_usize("element tag count")?;
        let mut tags = Vec::with_capacity(ntags);
        for _ in 0..ntags {
            tags.push(c.next_i32("element tag")?);
        }
        if etype == 2 {
            let mut corners = [0usize; 3];
            for corner in &mut corners {
                *corner = c.next_index("triangle node")?;
            }
            triangles.push(corners);
        } else {
            let s1 = c.next_index("edge node")?;
            let s2 = c.next_index("edge node")?;
            let label = tags.first().copied().unwrap_or(0);
            edges.push((s1, s2, label));
        }
    }

    Ok(RawMesh2d {
        vertices,
        triangles,
        edges,
    })
}

/// Writes the per-step solution files consumed by the external plotter:
/// one line per triangle holding the 15 local dof values (u at the 6 P2
/// nodes, v at the 6 P2 nodes, p at the 3 corners).
#[derive(Debug)]
pub struct SolutionWriter {
    dir: PathBuf,
}

#[derive(Serialize, Debug)]
pub struct RunMetadata {
    pub mesh_file: String,
    pub nv: usize,
    pub nbt: usize,
    pub nbe: usize,
    pub ndof: usize,
    pub nu: f64,
    pub dt: f64,
    pub steps_completed: usize,
}

impl SolutionWriter {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn write_named(&self, name: &str, mesh: &Mesh2d, x: &[f64]) -> io::Result<PathBuf> {
        let path = self.dir.join(name);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        let n = mesh.ndof;
        for k in 0..mesh.nbt {
            for il in 0..15 {
                let i = global_index(mesh, k, il, n);
                write!(writer, "{:.6e} ", x[i])?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// Solution of unsteady step `step`, written as `sol_<step>.txt`.
    pub fn write_step(&self, step: usize, mesh: &Mesh2d, x: &[f64]) -> io::Result<PathBuf> {
        self.write_named(&format!("sol_{}.txt", step), mesh, x)
    }

    pub fn write_metadata(&self, metadata: &RunMetadata) -> io::Result<PathBuf> {
        let path = self.dir.join("metadata.json");
        let json = serde_json::to_string_pretty(metadata).map_err(|e| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("failed to serialize metadata: {}", e),
            )
        })?;
        fs::write(&path, json)?;
        info!(path = %path.display(), "run metadata written");
        Ok(path)
    }
}
