//! Language Server Protocol (LSP) front end
//!
//! Provides editor features:
//! - "Test this method" / "Test this entire class" code lenses on `test_*.py`
//! - The five `python.djangoTestRunner.*` commands via `workspace/executeCommand`
//! - Error notifications (e.g. "No previous tests!")

pub mod backend;
pub mod convert;

pub use backend::DjangoTestServer;
