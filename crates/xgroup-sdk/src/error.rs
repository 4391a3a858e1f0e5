use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("document error: {0}")]
    Tree(#[from] xgroup_tree::TreeError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
