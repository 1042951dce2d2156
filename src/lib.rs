//! mvgt - exact nearest-neighbor ground truth for multi-vector datasets
//!
//! mvgt scores every test item against every train item and keeps the exact
//! top-k under two aggregated metrics:
//! - Euclidean distance, averaged over sub-vector positions
//! - Cosine distance, averaged over sub-vector positions
//!
//! The results serve as the correctness baseline that approximate search
//! systems are measured against.

pub mod config;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod eval;
pub mod output;
pub mod pipeline;
pub mod search;
pub mod storage;
pub mod types;
pub mod validate;

pub use distance::{aggregate, cosine_distance, euclidean_distance, Metric};
pub use error::{Error, Result};
pub use search::{find_ground_truth, NeighborFinder};
pub use types::{GroundTruthRecord, Neighborhood, Record, RecordId};
pub use validate::validate;
