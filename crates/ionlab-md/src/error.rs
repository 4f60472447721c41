//! Error types for ionlab-md.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MdError {
    #[error("configuration error: {0}")]
    Config(#[from] ionlab_model::ConfigError),

    #[error("energy model returned a non-finite potential at step {step}")]
    NonFinitePotential { step: usize },

    #[error("energy model returned a non-finite force on ion {index} at step {step}")]
    NonFiniteIonForce { index: usize, step: usize },

    #[error("energy model returned a non-finite force on vertex {index} at step {step}")]
    NonFiniteVertexForce { index: usize, step: usize },

    #[error("energy model returned {got} ion forces for {expected} ions")]
    IonForceShape { got: usize, expected: usize },

    #[error("energy model returned {got} vertex forces for {expected} vertices")]
    VertexForceShape { got: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, MdError>;
