//! Timing and mesh-state events.
//!
//! Libraries here only emit; the binary installs the subscriber. Timings go
//! to the `mesh_core::timing` target and mesh snapshots to
//! `mesh_core::mesh_state`, so either can be switched on alone:
//!
//! ```text
//! RUST_LOG=warn,mesh_core::timing=info mesh-split split model.stl -o parts/
//! ```
//!
//! Levels: `warn` for recoverable trouble (unit rescale, joint fallbacks,
//! soft part budget), `info` for stage summaries, `debug` for each cut and
//! joint, `trace` for per-face detail.

use std::time::Instant;

use tracing::{debug, info};

use crate::types::Mesh;

/// Logs how long a stage took when it goes out of scope.
///
/// ```
/// use mesh_core::tracing_ext::OperationTimer;
///
/// let _timer = OperationTimer::new("segment");
/// // stage body
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    _span: tracing::span::EnteredSpan,
}

impl OperationTimer {
    pub fn new(name: &'static str) -> Self {
        debug!(target: "mesh_core::timing", stage = name, "stage started");
        Self {
            name,
            start: Instant::now(),
            _span: tracing::info_span!("stage", stage = name).entered(),
        }
    }

    /// Timer whose span also records the input size.
    pub fn with_context(name: &'static str, face_count: usize, vertex_count: usize) -> Self {
        debug!(
            target: "mesh_core::timing",
            stage = name,
            faces = face_count,
            vertices = vertex_count,
            "stage started"
        );
        Self {
            name,
            start: Instant::now(),
            _span: tracing::info_span!("stage", stage = name, faces = face_count, vertices = vertex_count)
                .entered(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1e3
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "mesh_core::timing",
            stage = self.name,
            elapsed_ms = %format_args!("{:.2}", self.elapsed_ms()),
            "stage finished"
        );
    }
}

/// Debug-level snapshot of a mesh's size at a named point in a pipeline.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    match mesh.bounds() {
        Some(bounds) => debug!(
            target: "mesh_core::mesh_state",
            context,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            bounds = %bounds,
            "mesh state"
        ),
        None => debug!(target: "mesh_core::mesh_state", context, "mesh state: empty"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::block;

    #[test]
    fn test_timer_measures() {
        let timer = OperationTimer::new("sleep");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
    }

    #[test]
    fn test_mesh_stats_accepts_empty() {
        log_mesh_stats(&Mesh::new(), "empty");
        log_mesh_stats(&block(1.0, 2.0, 3.0), "block");
    }
}
