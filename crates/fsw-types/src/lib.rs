pub mod errors;
pub mod experiment;
pub mod layout;
pub mod settings;

pub use errors::*;
pub use experiment::*;
pub use layout::*;
pub use settings::*;
