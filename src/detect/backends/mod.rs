pub mod scripted;
pub mod stub;
pub mod synthetic;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use scripted::ScriptedBackend;
pub use stub::StubBackend;
pub use synthetic::SyntheticBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
