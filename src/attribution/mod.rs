pub mod fanout;
pub mod meta;

pub use fanout::{spawn_post_ingest, SendOutcome};
pub use meta::{AttributionData, Destination, MetaClient};
