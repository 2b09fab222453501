//! Mana sources, payment and the per-player engine

pub mod catalog;
pub mod choice;
pub mod engine;
pub mod logger;
pub mod mana_payment;

pub use catalog::{build_catalog, capacity_of, commander_identity, ManaCapacity, ManaSource, SourceCatalog, Yield};
pub use choice::{ChoiceResolver, ChoiceState, ColorOrigin, Prompt, PromptKind};
pub use engine::{ManaEngine, PaymentOutcome, TapOutcome};
pub use logger::{EngineLogger, OutputMode, VerbosityLevel};
pub use mana_payment::{
    GreedyManaResolver, ManaPaymentResolver, PaymentPlan, PaymentRequest, PaymentResult, PendingChoice, SourceTap,
};
