//! Cross-component flows: UI components, dispatcher and a scripted backend
//! sharing one `InMemoryEventBus`.

pub mod backend;
pub mod flows;
