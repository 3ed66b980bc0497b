/// Client core for the Crop Disease Early Warning System.
///
/// Modules:
/// - `model`: wire types and the error taxonomy.
/// - `diseases`: label registry with marker colors, display names and advice.
/// - `ingest`: backend clients (reports, predict, chat) and fixtures.
/// - `map`: markers, view state and GeoJSON export.
/// - `submission`: report submission state machine.
/// - `planner`: crop planning calculator.
/// - `dashboard`: single owner of all of the above, with worker threads.
/// - `analysis`: report summaries.
/// - `refresh`: refetch staleness policy.
/// - `config`: TOML + environment configuration.
/// - `logging`: structured logging over `log` / `env_logger`.
/// - `verify`: backend reachability checks.

pub mod analysis;
pub mod config;
pub mod dashboard;
pub mod diseases;
pub mod ingest;
pub mod logging;
pub mod map;
pub mod model;
pub mod planner;
pub mod refresh;
pub mod submission;
pub mod verify;
