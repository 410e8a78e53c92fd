use sitelens_fetcher::FetchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExploreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to load {url}: {source}")]
    RootNavigation {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Browsing session error: {0}")]
    Session(#[source] FetchError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Analysis task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ExploreError {
    /// Cookie payload problems are input errors, not session errors.
    pub(crate) fn from_session(err: FetchError) -> Self {
        match err {
            FetchError::InvalidCookie(msg) => ExploreError::InvalidInput(msg),
            FetchError::InvalidUrl(msg) => ExploreError::InvalidInput(msg),
            other => ExploreError::Session(other),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("No node with id '{0}'")]
    UnknownNode(String),

    #[error("Node '{0}' cannot be drilled into")]
    NotDrillable(String),

    #[error("Node '{0}' is already loading")]
    AlreadyLoading(String),

    #[error("Node '{0}' has already been analyzed")]
    AlreadyAnalyzed(String),

    #[error("Node '{0}' is not waiting on a drill")]
    StaleTicket(String),

    #[error("Node id '{0}' is already in the tree")]
    DuplicateId(String),
}

pub type Result<T> = std::result::Result<T, ExploreError>;
