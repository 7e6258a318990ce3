//! 资源组 handler

pub mod articles;
pub mod commandes;
pub mod ligcdes;
pub mod livraisons;
