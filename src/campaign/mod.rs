//! Campaign construction: data model, per-recipient blueprints, and set assembly.

pub mod assembler;
pub mod blueprint;
pub mod model;

pub use assembler::CampaignAssembler;
pub use blueprint::{BlueprintBuilder, BlueprintDefaults};
pub use model::{
    CampaignBlueprint, CampaignSet, DirectoryEntry, PromptSet, Recipient, SenderCredentials,
    Topic, TopicCatalog,
};
