//! rewind-core: the versioned history engine behind rewind.
//!
//! Design rules:
//! - One [`MasterIndex`] per session is the only clock; property logs never
//!   advance time on their own.
//! - A step is opened by the first real change after a save boundary, never
//!   by a save that changed nothing.
//! - Writing after an undo erases the redo future for good.
//! - Usage errors are detected before any state is touched.

/// Identifies the step (master index slot) a revision was written in.
pub type Stamp = u64;

/// Stamp of index 0. Index 0 is never re-opened, so it never changes.
pub const ORIGIN_STAMP: Stamp = 0;

/// Smallest non-zero history size accepted by
/// [`MasterIndex::set_max_history_size`].
pub const MIN_HISTORY_SIZE: usize = 8;

pub mod error;
pub mod history;
pub mod master;
pub mod timeline;
pub mod value;

pub use error::HistoryError;
pub use history::{PropertyHistory, Revision};
pub use master::MasterIndex;
pub use timeline::{BoundedTimeline, Capacity};
pub use value::{SameValue, Slot};
