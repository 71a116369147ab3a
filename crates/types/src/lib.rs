//! # tileprobe-types
//!
//! Data types shared by the tileprobe crates:
//!
//! - **Tiles**: `TileKey`, `TileState`, `TileRange`
//! - **Bounding boxes**: `BoundingBox2D` (geographic or projected pixel space)
//! - **Features**: `Feature`, `FeatureId`
//! - **Modes**: `FeatureMode`, `LoadingMode`
//!
//! All types are serializable with Serde and built on the `geo` crate.
//!
//! ## Examples
//!
//! ```rust
//! use geo::Point;
//! use tileprobe_types::bbox::BoundingBox2D;
//! use tileprobe_types::tile::TileRange;
//!
//! let range = TileRange::new(2, 3, 3, 3, 12);
//! assert_eq!(range.keys().count(), 2);
//!
//! let search = BoundingBox2D::around(&Point::new(5.0, 5.0), 5.0);
//! assert_eq!(search.center_distance_sq(&Point::new(8.0, 9.0)), 25.0);
//! ```

pub mod bbox;
pub mod config;
pub mod feature;
pub mod tile;
