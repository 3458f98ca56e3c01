//! The utilities module provides general capabilities that may span the
//! event, models, and simulator modules.  The utilities are centered
//! around error handling and debugging/traceability.

pub mod errors;
