//! Contour-line overlays for interactive 2D plots.
//!
//! A [`Contour2d`] takes a scalar field sampled on a rectangular grid, runs
//! segment extraction for each requested level, and tessellates the result
//! into a thin-quad mesh in the unit box of the data bounds. At draw time the
//! host's view box, data window and pixel ratio become a 3x3 transform plus a
//! pixel line width, and two passes go out through a [`GpuBackend`]: ribbons,
//! then round caps at segment endpoints.
//!
//! ```no_run
//! use contour2d::{create_contour2d, ContourOptions, Plot2d, RecordingBackend};
//!
//! let mut plot = Plot2d::new(RecordingBackend::new());
//! let options = ContourOptions::new([2, 2])
//!     .with_values(vec![0.0, 0.0, 1.0, 1.0])
//!     .with_level(0.5, [1.0, 0.0, 0.0, 1.0]);
//! let id = create_contour2d(&mut plot, &options)?;
//! plot.draw()?;
//! # let _ = id;
//! # Ok::<(), contour2d::ContourError>(())
//! ```

pub mod bounds;
pub mod contour;
pub mod error;
pub mod extract;
pub mod field;
pub mod gpu;
pub mod mesh;
pub mod options;
pub mod pick;
pub mod plot;
pub mod view;

pub use bounds::Bounds;
pub use contour::{create_contour2d, Contour2d, ContourBuffers, ContourPrograms};
pub use error::{ContourError, Result};
pub use extract::{Extraction, MarchingSquares, Segment, SegmentExtractor};
pub use field::{interpolate, Field};
pub use gpu::{
    BufferId, BufferRole, DrawCommand, GpuBackend, Primitive, ProgramId, ProgramSource,
    RecordingBackend, StreamBinding, WgpuBackend, WgpuBackendConfig,
};
pub use mesh::{ContourMesh, ContourVertex, Level, Rgba8};
pub use options::ContourOptions;
pub use pick::{NoPickResolver, PickContext, PickQuery, PickResolver, PickResult};
pub use plot::{ObjectId, Plot2d, PlotObject};
pub use view::{view_transform, ContourUniforms, PlotView, Rect};
