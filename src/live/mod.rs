/// Live stream notification discovery
pub mod decoder;
pub mod links;
pub mod pipeline;
pub mod video_id;

pub use decoder::{Envelope, NotificationDecoder, LIVE_MARKER};
pub use links::find_watch_link;
pub use pipeline::{DiscoveryPipeline, DiscoveryResult};
pub use video_id::extract_video_id;
