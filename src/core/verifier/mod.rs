mod jarsigner;

pub use jarsigner::{read_certificate, ArchiveVerifier, Certificate, JarSigner, VerifyOutcome};
