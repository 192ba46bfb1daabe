use spalloc_model::SpallocError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoaderError>;

/// One variant per validation rule in spec §4.2, each carrying the
/// offending field so operators can fix the machine description directly.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("machine name is blank or contains a reserved character: {0:?}")]
    BadName(String),

    #[error("tag is blank or contains a reserved character: {0:?}")]
    BadTag(String),

    #[error("width and height must both be >= 1, got {width}x{height}")]
    BadDimensions { width: u32, height: u32 },

    #[error("board at {triad} is out of bounds for a {width}x{height} machine")]
    OutOfBounds { triad: spalloc_model::Triad, width: u32, height: u32 },

    #[error("spinnaker_ips has {ips} entries but board_locations has {boards}")]
    IpCountMismatch { ips: usize, boards: usize },

    #[error("physical coordinate {0} has no entry in bmp_ips")]
    MissingBmpIp(spalloc_model::Physical),

    #[error(transparent)]
    Store(#[from] spalloc_store::StoreError),

    #[error("malformed machine description: {0}")]
    Parse(String),
}

impl From<LoaderError> for SpallocError {
    fn from(e: LoaderError) -> Self {
        match e {
            LoaderError::Store(e) => e.into(),
            e => SpallocError::BadRequest(e.to_string()),
        }
    }
}
