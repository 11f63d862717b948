//! Detection records and the geometry they carry.
//!
//! A backend reports boxes relative to the tile it was shown; callers want
//! boxes relative to the image they submitted. Both are represented by the
//! same types, tagged with a zero-sized coordinate space marker so the two
//! cannot be confused:
//!
//! - [`Local`]: tile-relative, as produced by an
//!   [`InferenceBackend`](crate::backend::InferenceBackend)
//! - [`Global`]: image-relative, as written to disk and returned over HTTP
//!
//! # Example
//!
//! ```
//! use tilewatch::detection::{BBoxXYXY, Detection, Global, Local};
//!
//! let local: Detection<Local> =
//!     Detection::new(BBoxXYXY::from_xyxy(10.0, 10.0, 20.0, 20.0), 0.9, 1u32);
//! let global: Detection<Global> = local.to_global(100, 50);
//! assert_eq!(global.bbox.to_array(), [110.0, 60.0, 120.0, 70.0]);
//! ```

mod bbox;
mod class_id;
mod coord;
pub mod io_json;
mod model;
mod space;

pub use bbox::BBoxXYXY;
pub use class_id::ClassId;
pub use coord::Coord;
pub use model::Detection;
pub use space::{Global, Local};
