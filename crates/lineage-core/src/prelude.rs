//! Convenient re-exports for downstream crates.

pub use crate::activity::{Activity, ActivityBuilder, ActivityCollection, Agent, AgentKind, Generation, Usage};
pub use crate::config::ProjectConfig;
pub use crate::entity::{Entity, EntityArena, EntityIdx, EntityKey, EntityKind, EntityTree};
pub use crate::error::{Error, Result};
pub use crate::id::{ActivityId, PlanId, RevisionId};
pub use crate::manifest::{GenerateManifest, ManifestId};
pub use crate::path::ContainmentPolicy;
pub use crate::plan::{Argument, InputPattern, MappedStream, OutputPattern, Plan};
pub use crate::provider::{
    Change, ChangeKind, Commit, ProviderError, RepositoryState, RevisionHistory, TreeEntry,
};
pub use crate::uri::UriBuilder;
