//! Mesh file I/O.
//!
//! Input: STL (binary or ASCII) and OBJ. Output: binary STL and 3MF.
//! Only the command-line front end touches files; the decomposition
//! pipeline itself works purely on in-memory meshes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{MeshError, MeshResult};
use crate::validate::{ValidationOptions, validate_mesh_data};
use crate::{Mesh, Vertex};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
    ThreeMf,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "stl" => Some(MeshFormat::Stl),
                "obj" => Some(MeshFormat::Obj),
                "3mf" => Some(MeshFormat::ThreeMf),
                _ => None,
            })
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Obj => "obj",
            MeshFormat::ThreeMf => "3mf",
        }
    }
}

fn unsupported(path: &Path) -> MeshError {
    MeshError::unsupported_format(path.extension().and_then(|e| e.to_str()).map(String::from))
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> MeshError {
    MeshError::io_write(path, std::io::Error::other(e.to_string()))
}

/// Load a mesh from file, auto-detecting format from extension.
pub fn load_mesh(path: &Path) -> MeshResult<Mesh> {
    let format = MeshFormat::from_path(path).ok_or_else(|| unsupported(path))?;

    info!(path = %path.display(), format = ?format, "Loading mesh");

    let mesh = match format {
        MeshFormat::Stl => load_stl(path)?,
        MeshFormat::Obj => load_obj(path)?,
        MeshFormat::ThreeMf => return Err(unsupported(path)),
    };

    if mesh.is_empty() {
        return Err(MeshError::empty_mesh("mesh has no vertices or faces"));
    }

    if let Some(bb) = mesh.bounds() {
        info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "Loaded mesh"
        );
        debug!(dimensions = %bb, "Source bounding box");
        if bb.max_extent() < 0.1 {
            warn!(
                max_extent = bb.max_extent(),
                "Mesh is extremely small; check source units"
            );
        }
    }

    validate_mesh_data(&mesh, &ValidationOptions::default())?;

    Ok(mesh)
}

/// Load mesh from STL file (binary or ASCII).
fn load_stl(path: &Path) -> MeshResult<Mesh> {
    let file = File::open(path).map_err(|e| MeshError::io_read(path, e))?;
    let mut reader = BufReader::new(file);

    // read_stl welds identical positions into an indexed mesh
    let stl =
        stl_io::read_stl(&mut reader).map_err(|e| MeshError::parse_error(path, e.to_string()))?;

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.vertices.push(Vertex::from_coords(
            v.0[0] as f64,
            v.0[1] as f64,
            v.0[2] as f64,
        ));
    }

    let mut skipped = 0usize;
    for face in &stl.faces {
        let indices = [
            face.vertices[0] as u32,
            face.vertices[1] as u32,
            face.vertices[2] as u32,
        ];
        if indices[0] != indices[1] && indices[1] != indices[2] && indices[0] != indices[2] {
            mesh.faces.push(indices);
        } else {
            skipped += 1;
        }
    }

    debug!(
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        degenerate_skipped = skipped,
        "STL converted"
    );

    Ok(mesh)
}

/// Load mesh from OBJ file, merging all models.
fn load_obj(path: &Path) -> MeshResult<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| MeshError::parse_error(path, e.to_string()))?;

    if models.is_empty() {
        return Err(MeshError::empty_mesh("OBJ file contains no models"));
    }

    let mut mesh = Mesh::new();
    for model in &models {
        let offset = mesh.vertices.len() as u32;
        let positions = &model.mesh.positions;
        mesh.vertices.extend(
            positions
                .chunks_exact(3)
                .map(|c| Vertex::from_coords(c[0] as f64, c[1] as f64, c[2] as f64)),
        );
        mesh.faces.extend(
            model
                .mesh
                .indices
                .chunks_exact(3)
                .map(|c| [c[0] + offset, c[1] + offset, c[2] + offset]),
        );
    }

    debug!(
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        models = models.len(),
        "OBJ loaded"
    );

    Ok(mesh)
}

/// Save mesh to file, auto-detecting format from extension.
pub fn save_mesh(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    match MeshFormat::from_path(path) {
        Some(MeshFormat::Stl) => save_stl(mesh, path),
        Some(MeshFormat::ThreeMf) => save_3mf(mesh, path, None),
        _ => Err(unsupported(path)),
    }
}

/// Save mesh to binary STL.
pub fn save_stl(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles()
        .map(|tri| {
            let n = tri.normal().unwrap_or_else(nalgebra::Vector3::zeros);
            let v = |p: nalgebra::Point3<f64>| {
                stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32])
            };
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [v(tri.v0), v(tri.v1), v(tri.v2)],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| MeshError::io_write(path, e))?;
    writer.flush().map_err(|e| MeshError::io_write(path, e))?;

    debug!(path = %path.display(), faces = mesh.face_count(), "Saved STL");
    Ok(())
}

/// Save mesh to a 3MF package.
///
/// 3MF keeps the indexed structure and declares millimeter units, which is
/// what slicers expect for the normalized parts.
pub fn save_3mf(mesh: &Mesh, path: &Path, name: Option<&str>) -> MeshResult<()> {
    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;

    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let entries = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", RELS_XML.to_string()),
        ("3D/3dmodel.model", generate_3mf_model_xml(mesh, name)),
    ];

    for (entry, contents) in &entries {
        zip.start_file(*entry, options)
            .map_err(|e| write_error(path, e))?;
        zip.write_all(contents.as_bytes())
            .map_err(|e| MeshError::io_write(path, e))?;
    }

    zip.finish().map_err(|e| write_error(path, e))?;

    debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Saved 3MF"
    );
    Ok(())
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Generate 3MF model XML content.
fn generate_3mf_model_xml(mesh: &Mesh, name: Option<&str>) -> String {
    use std::fmt::Write as _;

    let mut xml = String::with_capacity(mesh.vertices.len() * 60 + mesh.faces.len() * 50);

    let name_attr = name
        .map(|n| format!(" name=\"{}\"", escape_xml(n)))
        .unwrap_or_default();

    let _ = write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="1" type="model"{name_attr}>
      <mesh>
        <vertices>
"#
    );

    for v in &mesh.vertices {
        let _ = writeln!(
            xml,
            "          <vertex x=\"{:.6}\" y=\"{:.6}\" z=\"{:.6}\"/>",
            v.position.x, v.position.y, v.position.z
        );
    }

    xml.push_str("        </vertices>\n        <triangles>\n");

    for face in &mesh.faces {
        let _ = writeln!(
            xml,
            "          <triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>",
            face[0], face[1], face[2]
        );
    }

    xml.push_str(
        r#"        </triangles>
      </mesh>
    </object>
  </resources>
  <build>
    <item objectid="1"/>
  </build>
</model>
"#,
    );

    xml
}

/// 3MF Content Types XML.
const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>
"#;

/// 3MF Relationships XML.
const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>
"#;

impl Mesh {
    /// Load a mesh from a file.
    pub fn load(path: impl AsRef<Path>) -> MeshResult<Mesh> {
        load_mesh(path.as_ref())
    }

    /// Save a mesh to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> MeshResult<()> {
        save_mesh(self, path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::cuboid;
    use std::io::Read;

    #[test]
    fn test_format_detection() {
        assert_eq!(MeshFormat::from_path(Path::new("a.STL")), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::from_path(Path::new("a.3mf")), Some(MeshFormat::ThreeMf));
        assert_eq!(MeshFormat::from_path(Path::new("a.ply")), None);
    }

    #[test]
    fn test_stl_roundtrip_welds_vertices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box.stl");
        let block = cuboid([0.0, 0.0, 0.0], [40.0, 20.0, 10.0]);
        block.save(&path).unwrap();

        let loaded = Mesh::load(&path).unwrap();
        assert_eq!(loaded.vertex_count(), 8);
        assert_eq!(loaded.face_count(), 12);
        assert!((loaded.volume() - 8000.0).abs() < 1e-3);
    }

    #[test]
    fn test_obj_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.obj");
        std::fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 3 2\nf 1 2 4\nf 1 4 3\nf 2 3 4\n",
        )
        .unwrap();
        let mesh = Mesh::load(&path).unwrap();
        assert_eq!(mesh.face_count(), 4);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_3mf_package_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.3mf");
        let block = cuboid([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        save_3mf(&block, &path, Some("part <1>")).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut model = String::new();
        archive
            .by_name("3D/3dmodel.model")
            .unwrap()
            .read_to_string(&mut model)
            .unwrap();
        assert!(model.contains("unit=\"millimeter\""));
        assert!(model.contains("name=\"part &lt;1&gt;\""));
        assert_eq!(model.matches("<triangle ").count(), 12);
        assert!(archive.by_name("[Content_Types].xml").is_ok());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Mesh::load("model.ply").unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat { .. }));
    }
}
