pub mod encoded;
pub mod media;
