use oxiclass_core::MlError;
use oxiclass_datasets::StudentsError;
use thiserror::Error;

/// Errors surfaced by the experiment workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("cannot render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error(transparent)]
    Students(#[from] StudentsError),

    #[error(transparent)]
    Ml(#[from] MlError),

    #[error("model {model} failed: {source}")]
    Model {
        model: String,
        #[source]
        source: MlError,
    },
}

impl From<figment::Error> for WorkflowError {
    fn from(err: figment::Error) -> Self {
        WorkflowError::Config(Box::new(err))
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
