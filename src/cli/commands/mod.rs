mod ingest;
mod lookup;
mod platforms;
mod refresh;
mod search;
mod season;

pub use ingest::{cmd_ingest, cmd_ingest_movie};
pub use lookup::cmd_lookup;
pub use platforms::cmd_platforms;
pub use refresh::cmd_refresh;
pub use search::cmd_search;
pub use season::cmd_season;
