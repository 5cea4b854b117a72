// ─── WebLaunch Core ───
// Backend of a Java Web Start (JNLP) launcher.
//
// Architecture:
//   core/
//     registry/     URL scheme / file extension → handler
//     descriptor/   JNLP serde model + platform filtering
//     downloader/   Cache-aware HTTP fetcher (Last-Modified)
//     verifier/     jarsigner verification + certificate extraction
//     acquire/      Concurrent archive pipeline + extension resolver
//     store/        Content-addressed resource dirs + update check
//     launch/       Native extraction, command line, process spawn
//     integration/  Shortcuts and installed-apps records
//     java/         Runtime discovery + version precheck
//     jnlp/         Launch orchestrator and uninstall
//     messaging/    Browser native-messaging codec + listener
//     state/        Settings and work dir

pub mod acquire;
pub mod descriptor;
pub mod downloader;
pub mod error;
pub mod http;
pub mod integration;
pub mod java;
pub mod jnlp;
pub mod launch;
pub mod messaging;
pub mod progress;
pub mod registry;
pub mod state;
pub mod store;
pub mod verifier;
