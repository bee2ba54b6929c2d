pub mod decision;
pub mod error;
pub mod error_ledger;
pub mod id_cache;
pub mod id_cache_storage;
pub mod id_resolver;
pub mod json_file;
pub mod reference;
pub mod show_state;
pub mod sync;

pub use decision::{decide, SkipReason, UpdateDecision};
pub use error::SweepError;
pub use error_ledger::{ErrorLedger, LedgerEntry};
pub use id_cache::{CacheLookup, IdCache};
pub use id_resolver::{IdResolver, ResolverStats};
pub use reference::{DatasetSource, ReferenceData, ReferenceDataStore};
pub use show_state::{derive_status, ShowState};
pub use sync::{SweepOptions, SweepReport, SweepSettings, SyncOrchestrator};
