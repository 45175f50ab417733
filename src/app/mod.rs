// Application boundary: the ports the pipeline stages talk to

pub mod ports;

pub use ports::{
    ArtifactExchange, ArtifactReference, ArtifactStore, ArtifactVersion, ComponentRunner,
    ResolvedArtifact,
};
