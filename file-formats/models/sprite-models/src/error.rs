use frame_models::ModelError;
use thiserror::Error;

/// Error types for building sprite-to-model associations
#[derive(Error, Debug)]
pub enum AssociationError {
    /// A model definition names a class the resolver does not know
    #[error("Unknown actor class '{0}'")]
    UnknownClass(String),

    /// A frame assignment names a sprite missing from the catalog
    #[error("Unknown sprite '{sprite}' in model definition for '{class}'")]
    UnknownSprite { sprite: String, class: String },

    /// Frame characters must be letters `A` and up, 29 in total
    #[error("Invalid frame character '{ch}' in model definition for '{class}'")]
    InvalidFrameCharacter { ch: char, class: String },

    /// Model slots are numbered `0..MAX_MODELS_PER_FRAME`
    #[error("Model slot {slot} out of range in model definition for '{class}'")]
    SlotOutOfRange { slot: usize, class: String },

    /// Error from loading a model file
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type using AssociationError
pub type Result<T> = std::result::Result<T, AssociationError>;
