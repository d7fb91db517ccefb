pub mod document;
pub mod engine;
pub mod error;
pub mod overlay;
pub mod paths;
pub mod reference;
pub mod registry;
pub mod settings;
pub mod state;
pub mod util;
