mod entry;
pub use entry::*;

mod index;
pub use index::*;

mod volume;
pub use volume::*;
