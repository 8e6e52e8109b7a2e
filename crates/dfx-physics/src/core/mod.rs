pub mod clock;
pub mod contacts;
pub mod registry;
pub mod runtime;
pub mod world;
