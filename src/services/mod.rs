//! 服务模块

pub mod composer;
pub mod conversation_log;
pub mod detection_buffer;
pub mod medical_phrasing;
pub mod session;
pub mod symptom_mapper;
pub mod trigger;

pub use composer::{
    ClosingCategory, Composition, CompositionSource, FixedSelector, PhraseSelector,
    RandomSelector, SentenceComposer,
};
pub use conversation_log::ConversationLog;
pub use detection_buffer::DetectionBuffer;
pub use medical_phrasing::{MedicalPhrasingService, PhrasingService, create_phrasing_service};
pub use session::registry::SessionRegistry;
pub use session::{SamplingHandle, SessionController, SessionSnapshot, TickOutcome};
pub use symptom_mapper::SymptomMapper;
pub use trigger::{CooldownPolicy, Readiness, SentenceTrigger, TriggerConfig, TriggerPhase};
