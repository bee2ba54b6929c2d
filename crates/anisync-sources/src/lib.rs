pub mod anilist;
pub mod error;
pub mod plex;
pub mod reference;
pub mod traits;

pub use anilist::AniListClient;
pub use error::SourceError;
pub use plex::PlexLibrary;
pub use reference::HttpReferenceFetcher;
pub use traits::{LibrarySource, PushOutcome, ReferenceFetcher, TrackingService};
