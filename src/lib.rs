pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod fields;
pub mod forcing;
pub mod grid;
pub mod passes;
pub mod pipeline;
pub mod snapshot;
pub mod sun;
pub mod terrain;

pub use config::{SimParams, WorldConfig};
pub use engine::Engine;
pub use error::{Result, SimError};
pub use field::{FieldDecl, FieldId, FieldStore, FieldView};
pub use forcing::{CursorTracker, Forcing, ForcingMode, Tool};
pub use grid::{EdgeMode, Grid, GridUv};
pub use pipeline::{CellOutput, Kernel, PassInputs, Pipeline, TickReport, kernel_fn};
pub use snapshot::{ViewMode, render_view, save_view};
pub use sun::{GridPoint, LightPoint, SunTransform};
pub use terrain::generate_elevation;
