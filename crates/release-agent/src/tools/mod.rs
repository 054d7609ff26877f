//! Release process actions the model can invoke.
//!
//! The backends are mocked: every record gets a fresh identifier and nothing
//! is persisted.

mod change_context;
mod kitz;
mod search_kmnrs;

pub use change_context::{ChangeContext, CreateChangeContextTool};
pub use kitz::{CreateKitzTool, Kitz};
pub use search_kmnrs::{Kmnr, SearchPreviousKmnrsTool};
