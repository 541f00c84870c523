pub mod filesystem;

pub use filesystem::ArtifactStorage;
