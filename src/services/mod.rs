pub mod concept_service;
pub mod json_extractor;
pub mod mindmap_service;
pub mod practice_service;
pub mod qa_service;
pub mod session;
pub mod visitor_counter;

#[cfg(test)]
pub(crate) mod testing;

pub use concept_service::ConceptService;
pub use mindmap_service::MindmapService;
pub use practice_service::PracticeService;
pub use qa_service::QaService;
pub use session::SessionService;
pub use visitor_counter::{CounterBackend, LocalCounter, RemoteCounter, VisitorCounter};
