//! Writing a segmentation result to disk.
//!
//! Each part becomes one model file (`part_00.3mf`, `part_01.3mf`, ...)
//! next to a `manifest.json` describing how the parts mate. Everything is
//! written into a hidden staging directory beside the target and renamed
//! into place only once every file is complete, so a failed or interrupted
//! export never leaves a half-written output directory behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, info};

use mesh_core::{MeshFormat, UnitNormalization, save_3mf, save_stl};
use mesh_segment::{
    CutRecord, Joint, JointRole, JointWarning, Seam, SeamRef, SegmentationResult, SegmentationSummary,
};

/// Name of the manifest file inside an output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// File format for exported parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PartFormat {
    /// 3D Manufacturing Format package
    #[default]
    #[value(name = "3mf")]
    ThreeMf,
    /// Binary STL
    Stl,
}

impl PartFormat {
    fn mesh_format(self) -> MeshFormat {
        match self {
            PartFormat::ThreeMf => MeshFormat::ThreeMf,
            PartFormat::Stl => MeshFormat::Stl,
        }
    }
}

/// File name of part `id`.
pub fn part_file_name(id: usize, format: PartFormat) -> String {
    format!("part_{:02}.{}", id, format.mesh_format().extension())
}

#[derive(Debug, Serialize)]
pub struct BoundsEntry {
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub extents: [f64; 3],
}

#[derive(Debug, Serialize)]
pub struct JointUse {
    pub joint: usize,
    pub role: JointRole,
}

#[derive(Debug, Serialize)]
pub struct PartEntry {
    pub id: usize,
    pub file: String,
    pub bounds: BoundsEntry,
    pub volume: f64,
    pub faces: usize,
    pub seams: Vec<SeamRef>,
    pub joints: Vec<JointUse>,
}

/// Contents of `manifest.json`.
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<&'a UnitNormalization>,
    pub build_volume: [f64; 3],
    pub summary: &'a SegmentationSummary,
    pub parts: Vec<PartEntry>,
    pub seams: &'a [Seam],
    pub joints: &'a [Joint],
    pub cuts: &'a [CutRecord],
    pub warnings: &'a [JointWarning],
}

impl<'a> Manifest<'a> {
    pub fn new(result: &'a SegmentationResult, source: &str, format: PartFormat) -> Self {
        let parts = result
            .parts()
            .iter()
            .map(|part| PartEntry {
                id: part.id,
                file: part_file_name(part.id, format),
                bounds: BoundsEntry {
                    min: [part.bounds.min.x, part.bounds.min.y, part.bounds.min.z],
                    max: [part.bounds.max.x, part.bounds.max.y, part.bounds.max.z],
                    extents: part.extents(),
                },
                volume: part.volume(),
                faces: part.mesh.face_count(),
                seams: part.seams.clone(),
                joints: result
                    .joints_for(part.id)
                    .map(|(joint, role)| JointUse {
                        joint: joint.id,
                        role,
                    })
                    .collect(),
            })
            .collect();

        Self {
            source: source.to_string(),
            units: result.units(),
            build_volume: result.build_volume(),
            summary: result.summary(),
            parts,
            seams: result.seams(),
            joints: result.joints(),
            cuts: result.cuts(),
            warnings: result.warnings(),
        }
    }
}

/// What an export produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub directory: PathBuf,
    pub files: Vec<String>,
    pub manifest: String,
}

/// Write all parts and the manifest into `dir`.
///
/// `dir` must not exist unless `overwrite` is set, in which case it is
/// replaced only after the new output is complete.
pub fn export_result(
    result: &SegmentationResult,
    source: &str,
    dir: &Path,
    format: PartFormat,
    overwrite: bool,
) -> Result<ExportReport> {
    if dir.exists() && !overwrite {
        bail!("Output directory {:?} already exists (use --force to replace it)", dir);
    }

    let staging = staging_dir(dir)?;
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("Failed to clear stale staging directory {:?}", staging))?;
    }
    fs::create_dir_all(&staging)
        .with_context(|| format!("Failed to create staging directory {:?}", staging))?;

    match write_all(result, source, &staging, format) {
        Ok(files) => {
            publish(&staging, dir)?;
            info!(dir = %dir.display(), parts = files.len(), "Exported parts");
            Ok(ExportReport {
                directory: dir.to_path_buf(),
                files,
                manifest: MANIFEST_FILE.to_string(),
            })
        }
        Err(e) => {
            // Best effort: the staging directory is never published.
            let _ = fs::remove_dir_all(&staging);
            Err(e)
        }
    }
}

fn staging_dir(dir: &Path) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid output directory {:?}", dir))?;
    let parent = match dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok(parent.join(format!(".{}.partial-{}", name, std::process::id())))
}

fn write_all(
    result: &SegmentationResult,
    source: &str,
    staging: &Path,
    format: PartFormat,
) -> Result<Vec<String>> {
    let mut files = Vec::with_capacity(result.parts().len());
    for part in result.parts() {
        let file = part_file_name(part.id, format);
        let path = staging.join(&file);
        let name = format!("part_{:02}", part.id);
        let saved = match format {
            PartFormat::ThreeMf => save_3mf(&part.mesh, &path, Some(name.as_str())),
            PartFormat::Stl => save_stl(&part.mesh, &path),
        };
        saved.with_context(|| format!("Failed to write part {} to {:?}", part.id, path))?;
        debug!(part = part.id, file = %file, "Wrote part");
        files.push(file);
    }

    let manifest = Manifest::new(result, source, format);
    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
    let path = staging.join(MANIFEST_FILE);
    fs::write(&path, json).with_context(|| format!("Failed to write manifest {:?}", path))?;
    Ok(files)
}

/// Move the finished staging directory to `dir`, replacing what was there.
fn publish(staging: &Path, dir: &Path) -> Result<()> {
    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory {:?}", parent))?;
    }
    if dir.exists() {
        fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to remove existing output {:?}", dir))?;
    }
    fs::rename(staging, dir)
        .with_context(|| format!("Failed to move {:?} into place at {:?}", staging, dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_core::load_mesh;
    use mesh_core::primitives::block;
    use mesh_segment::{SegmentationConfig, segment_mesh};

    fn long_block_result() -> SegmentationResult {
        segment_mesh(&block(400.0, 100.0, 100.0), &SegmentationConfig::default()).unwrap()
    }

    #[test]
    fn test_part_file_names() {
        assert_eq!(part_file_name(3, PartFormat::ThreeMf), "part_03.3mf");
        assert_eq!(part_file_name(12, PartFormat::Stl), "part_12.stl");
    }

    #[test]
    fn test_export_writes_parts_and_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("parts");
        let result = long_block_result();

        let report = export_result(&result, "block.stl", &out, PartFormat::ThreeMf, false).unwrap();
        assert_eq!(report.files, vec!["part_00.3mf", "part_01.3mf"]);
        assert!(out.join("part_00.3mf").exists());
        assert!(out.join("part_01.3mf").exists());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(json["parts"].as_array().unwrap().len(), 2);
        assert_eq!(json["seams"][0]["axis"], "x");
        assert_eq!(json["seams"][0]["below"], 0);
        assert_eq!(json["seams"][0]["above"], 1);
        assert_eq!(json["joints"][0]["kind"]["type"], "integrated");
        assert_eq!(json["parts"][0]["joints"].as_array().unwrap().len(), 2);

        // Nothing else is left beside the output.
        let entries: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_stl_export_loads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("stl");
        let result = long_block_result();
        export_result(&result, "block.stl", &out, PartFormat::Stl, false).unwrap();

        let part = load_mesh(&out.join("part_01.stl")).unwrap();
        assert_eq!(part.face_count(), result.parts()[1].mesh.face_count());
    }

    #[test]
    fn test_existing_directory_needs_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("parts");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("old.txt"), "old").unwrap();
        let result = long_block_result();

        assert!(export_result(&result, "block.stl", &out, PartFormat::Stl, false).is_err());
        assert!(out.join("old.txt").exists());

        export_result(&result, "block.stl", &out, PartFormat::Stl, true).unwrap();
        assert!(!out.join("old.txt").exists());
        assert!(out.join(MANIFEST_FILE).exists());
    }
}
