//! Building-piece registration.
//!
//! # Data Flow
//! ```text
//! plugin awake
//!     → piece.rs (BuildPiece declarations)
//!     → registry.rs (validate, store, generate per-piece config)
//!     → config store + sync registry
//! ```
//!
//! # Design Decisions
//! - Registration is order-independent and one-shot
//! - Asset loading and rendering are left to the game; requests are only recorded

pub mod piece;
pub mod registry;

use thiserror::Error;

use crate::config::ConfigError;

pub use piece::{
    BuildPiece, BuildPieceCategory, CraftingTable, RequiredItems, Requirement, SpecialProperties,
};
pub use registry::{
    MaterialSwap, PieceConfig, PieceRegistry, PrefabRef, ShaderSwap, ShaderType,
};

/// Errors from declaring pieces.
#[derive(Debug, Error)]
pub enum PieceError {
    #[error("Piece field '{field}' must not be empty")]
    EmptyIdentifier { field: &'static str },

    #[error("Piece {prefab} requires zero of {item}")]
    InvalidAmount { prefab: String, item: String },

    #[error("Piece {prefab} is already registered")]
    Duplicate { prefab: String },

    #[error("Invalid crafting costs for {prefab}: {reason}")]
    InvalidCosts { prefab: String, reason: String },

    #[error("Pieces {first} and {second} would share config section '{section}'")]
    SectionCollision {
        section: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
