pub mod clock;
pub mod errors;
pub mod importer;
pub mod models;
pub mod repo;
pub mod tracker;
pub mod validator;

pub use clock::*;
pub use errors::*;
pub use importer::*;
pub use models::*;
pub use repo::*;
pub use tracker::*;
pub use validator::*;
