use thiserror::Error;

/// Everything that can stop a prediction run.
///
/// None of these are recoverable: a malformed matrix or an unparsable kernel
/// block would shift indices and silently corrupt every downstream number.
#[derive(Error, Debug)]
pub enum LocError {
    /// Malformed header or row in a matrix, parameter, label or FASTA file
    #[error("Format error in {origin}: {message}")]
    Format { origin: String, message: String },

    /// The kernel tool produced unparsable or dimensionally inconsistent output
    #[error("Kernel output error: {0}")]
    KernelOutput(String),

    /// Training or scoring failed in the SVM
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// An invoked external process exited unsuccessfully
    #[error("External tool `{tool}` failed ({status}): {stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    /// Missing data files, pre-existing outputs, unmatched inputs
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LocError {
    pub fn format(origin: impl Into<String>, message: impl Into<String>) -> Self {
        LocError::Format {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn kernel(message: impl Into<String>) -> Self {
        LocError::KernelOutput(message.into())
    }

    pub fn classifier(message: impl Into<String>) -> Self {
        LocError::Classifier(message.into())
    }

    pub fn setup(message: impl Into<String>) -> Self {
        LocError::Setup(message.into())
    }
}

pub type Result<T> = std::result::Result<T, LocError>;
