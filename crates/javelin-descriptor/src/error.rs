pub type Result<T> = std::result::Result<T, DescriptorError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("invalid field descriptor: {0}")]
    InvalidFieldDescriptor(String),
    #[error("invalid method descriptor: {0}")]
    InvalidMethodDescriptor(String),
    #[error("void does not have an array type")]
    NoArrayOfVoid,
}
