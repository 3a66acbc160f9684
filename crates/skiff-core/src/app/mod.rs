pub mod descriptor;

pub use descriptor::{AppDescriptor, Channel, FeedSource, Target, DESCRIPTOR_FILE};
