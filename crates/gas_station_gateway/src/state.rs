use std::sync::Arc;

use async_trait::async_trait;
use gas_station_ledger::CreditLedger;
use gas_station_oracle::ChainOracle;
use gas_station_scheduler::Scheduler;

/// Verifies a signature over the Micheline-encoded call parameters against
/// the declared sender's public key (§6 "Withdraw signature", reused for
/// `/signed_operation`). Out of core scope per spec.md §1; this seam exists
/// so the handlers compile against a real collaborator rather than hiding
/// the check inline.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(&self, public_key: &str, message: &[u8], signature: &str) -> bool;
}

/// Accepts nothing; wired in by default so the service runs out of the box.
/// A real deployment replaces this with a verifier backed by the chain's
/// signature scheme.
pub struct NoopSignatureVerifier;

#[async_trait]
impl SignatureVerifier for NoopSignatureVerifier {
    async fn verify(&self, _public_key: &str, _message: &[u8], _signature: &str) -> bool {
        false
    }
}

/// Shared, cheap-to-clone handles every handler needs, the way
/// `apollo_http_server`'s `AppState` holds a `SharedGatewayClient`.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn CreditLedger>,
    pub oracle: Arc<dyn ChainOracle>,
    pub scheduler: Scheduler,
    pub signature_verifier: Arc<dyn SignatureVerifier>,
}
