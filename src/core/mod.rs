// ─── Playdeck Core ───
// Installer pipeline and game launcher.
//
// Architecture:
//   core/
//     installer/ : Descriptor parsing, install session, action executor
//     downloader/: HTTP downloads and installer file resolution
//     config/    : YAML system, runner and game configs
//     runners/   : Runner command line builders (ZDoom)
//     launch/    : Process spawner for installed games
//     frontend   : Prompts and progress reporting boundary
//     state/     : Global application state

pub mod config;
pub mod downloader;
pub mod error;
pub mod frontend;
pub mod http;
pub mod installer;
pub mod launch;
pub mod runners;
pub mod state;
