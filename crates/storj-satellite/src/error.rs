use storj_erasure::ErasureError;
use storj_kv::KvError;
use storj_metainfo::MetainfoError;
use storj_piecestore::PieceError;
use thiserror::Error;

/// Error taxonomy of §7, restricted to what the background loops and the
/// ambient stores can themselves raise.
#[derive(Debug, Error)]
pub enum SatelliteError {
    #[error("pointer not found: {0:?}")]
    PointerNotFound(Vec<u8>),
    #[error("pointer has no remote segment")]
    NotRemote,
    #[error(transparent)]
    Metainfo(#[from] MetainfoError),
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error(transparent)]
    Erasure(#[from] ErasureError),
    #[error(transparent)]
    Piece(#[from] PieceError),
}

pub type Result<T> = std::result::Result<T, SatelliteError>;
