mod dispatch;
mod rotation;

pub use dispatch::{update_track, DiscoveryTrack};
pub use rotation::{peek_next_scope, RegionList};
