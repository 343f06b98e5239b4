use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No pack can ever be produced for this set.
    #[error("No booster-eligible cards found for set {0}.")]
    NoEligibleCards(String),

    #[error("Invalid draft settings: {0}")]
    Settings(String),

    #[error("Failed to generate booster: {0}")]
    Generation(String),

    #[error("Failed to load card data: {0}")]
    CardData(String),

    #[error("Failed to export deck: {0}")]
    Export(String),
}

pub type Res<T> = Result<T, Error>;

pub fn err<T, S: ToString>(message: S) -> Res<T> {
    Err(Error::Generation(message.to_string()))
}
