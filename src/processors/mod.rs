//! Image processing stages: preprocessing, grid localization, structure
//! analysis and cell extraction.

pub mod cells;
pub mod localize;
pub mod preprocess;
pub mod structure;

pub use cells::{CellExtractor, CellImage};
pub use localize::{CanonicalGrid, GridLocalizer};
pub use preprocess::ImagePreprocessor;
pub use structure::{GridStructure, GridStructureAnalyzer, LineGroup};
