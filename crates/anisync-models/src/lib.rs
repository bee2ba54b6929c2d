pub mod media;
pub mod remote;
pub mod status;

pub use media::LibrarySeason;
pub use remote::{RemoteEntry, RemoteListing};
pub use status::WatchStatus;
