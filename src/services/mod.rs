//! # Services Module
//!
//! Page-scoped state and the operation dispatcher behind the counter buttons.

pub mod counter_dispatcher;
pub mod page;
pub mod page_registry;

pub use counter_dispatcher::{CounterEnv, OperationReport, dispatch};
pub use page::PageContext;
pub use page_registry::PageRegistry;
