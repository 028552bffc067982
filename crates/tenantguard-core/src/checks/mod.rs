//! The fixed, ordered control catalog.
//!
//! Evaluators are grouped per backend service. [`registry`] builds the
//! catalog in its canonical order; a Run's result order always follows it.

pub mod collaboration;
pub mod compliance;
pub mod directory;
pub mod mail;

pub use directory::MAX_PRIVILEGED_ADMINS;
pub use mail::DEFAULT_SAMPLE_SIZE;

use crate::registry::ControlEvaluator;

/// Build the ordered control catalog.
///
/// `sample_size` configures the sample-based mailbox delegate control; it
/// is recorded in that control's evidence.
pub fn registry(sample_size: usize) -> Vec<Box<dyn ControlEvaluator>> {
    vec![
        Box::new(mail::MailboxAuditing::new()),
        Box::new(mail::ExternalForwarding::new()),
        Box::new(mail::TlsEnforced::new()),
        Box::new(mail::DelegateSample::new(sample_size)),
        Box::new(directory::PrivilegedAdminCount::new()),
        Box::new(directory::LegacyAuthBlocked::new()),
        Box::new(directory::GuestInviteRestricted::new()),
        Box::new(collaboration::AnonymousLinks::new()),
        Box::new(collaboration::ExternalDomainAllowlist::new()),
        Box::new(compliance::UnifiedAuditLog::new()),
        Box::new(compliance::DlpPolicyEnabled::new()),
        Box::new(compliance::RetentionPolicyPresent::new()),
    ]
}
