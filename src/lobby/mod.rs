//! Lobby domain: data model, registries, command routing and broadcast.

pub mod broadcast;
pub mod code;
pub mod registry;
pub mod router;
mod types;

pub use broadcast::BroadcastEngine;
pub use registry::{LobbyRegistry, SessionRegistry};
pub use router::MessageRouter;
pub use types::{ChatEntry, EntryKind, Lobby, LobbySnapshot, Member, MemberInfo};
