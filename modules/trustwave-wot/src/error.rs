use thiserror::Error;

use trustwave_common::Identity;
use trustwave_events::ClientError;

pub type Result<T> = std::result::Result<T, TrustError>;

#[derive(Debug, Error)]
pub enum TrustError {
    /// The viewer's own follow list could not be fetched. Nothing downstream
    /// is meaningful without it.
    #[error("Follow list for {viewer} unavailable: {source}")]
    FollowListUnavailable {
        viewer: Identity,
        #[source]
        source: ClientError,
    },

    #[error("Publish failed: {0}")]
    Publish(#[source] ClientError),

    #[error("Published event {id} (kind {kind}) did not parse back")]
    Unparseable { id: String, kind: u16 },
}
