use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Offset {offset:#X} is outside of the {capacity:#X} byte flash")]
    OutOfRange { offset: usize, capacity: usize },

    #[error("Cannot read the flash image: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid flash image: {0}")]
    Image(#[from] flash_image::Error),

    #[error("Cannot open the monitor output {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
