//! Inbound port. Admin console (adapter) calls into the application.

use crate::domain::DomainError;

/// Input port: interactive admin surface driving the use cases.
#[async_trait::async_trait]
pub trait AdminPort: Send + Sync {
    /// Run the admin menu loop until the operator quits.
    async fn run(&self) -> Result<(), DomainError>;
}
