pub mod movie;
pub mod platform;
pub mod season;
pub mod snapshot;

pub use movie::MovieRecord;
pub use platform::PlatformConfig;
pub use season::{DramaStatus, ReleaseSchedule, SeasonRecord, SeasonSet};
pub use snapshot::CacheSnapshot;
