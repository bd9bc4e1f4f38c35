/// Authentication module
///
/// Password digests, token encoding and signing, the revocation ledger, and
/// the `TokenAuthority` that ties them together.

mod authority;
mod claims;
mod clock;
pub mod codec;
mod password;
mod revocation;
pub mod signer;

pub use authority::{IssuedToken, TokenAuthority};
pub use claims::{Claims, Header, Identity, TOKEN_TYPE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use password::{validate_password_strength, CredentialHasher};
pub use revocation::{RevocationEntry, RevocationLedger, StorageFailurePolicy};
pub use signer::Algorithm;
